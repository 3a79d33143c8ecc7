// Simulated delivery receipts for outgoing messages
//
// An accepted message is acknowledged immediately (sent), then reaches
// delivered and read on timers. Each transition fires once and only moves the
// status forward.

use log::{debug, info};

use super::tasks::TaskSet;
use super::{ConversationEvent, EngineContext, ViewToken};
use crate::models::DeliveryStatus;

/// Register the delivered and read transitions for `message_id` against the
/// owning view.
pub(crate) fn schedule(ctx: &EngineContext, tasks: &mut TaskSet, token: &ViewToken, message_id: &str) {
    let delivered_at = ctx.settings.delivered_after;
    let read_at = delivered_at + ctx.settings.read_after;

    for (delay, target) in [
        (delivered_at, DeliveryStatus::Delivered),
        (read_at, DeliveryStatus::Read),
    ] {
        let ctx = ctx.clone();
        let token = token.clone();
        let message_id = message_id.to_string();
        tasks.spawn_after(delay, async move {
            advance(&ctx, &token, &message_id, target).await;
        });
    }
}

/// Apply one receipt. Returns false when the view is gone, the message is
/// unknown, or the message is already at or past `target`.
pub(crate) async fn advance(
    ctx: &EngineContext,
    token: &ViewToken,
    message_id: &str,
    target: DeliveryStatus,
) -> bool {
    let mut state = ctx.state.lock().await;
    if !state.is_current(token) {
        debug!(
            "Dropping {:?} receipt for {}: conversation {} was closed",
            target, message_id, token.chat_id
        );
        return false;
    }

    let Some(message) = state.message_mut(&token.chat_id, message_id) else {
        debug!("Receipt for unknown message {}", message_id);
        return false;
    };

    let previous = message.status;
    if !message.advance_status(target) {
        debug!(
            "Ignoring {:?} receipt for {} already at {:?}",
            target, message_id, previous
        );
        return false;
    }
    let updated = message.clone();

    info!("Message {} status {:?} -> {:?}", message_id, previous, updated.status);
    ctx.store.lock().await.sync_last_message(&updated);
    ctx.emit(ConversationEvent::StatusChanged {
        chat_id: updated.chat_id.clone(),
        message_id: updated.id.clone(),
        status: updated.status,
    });
    true
}
