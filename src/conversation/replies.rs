// Simulated incoming replies from a chat's participant

use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use super::{ConversationEvent, EngineContext, ViewToken};
use crate::models::{DeliveryStatus, Message, MessageKind, User};

/// Append a reply from `from` to the view's timeline, as a real incoming
/// message would be. Unread bookkeeping applies when the view is not active.
pub(crate) async fn deliver(ctx: &EngineContext, token: &ViewToken, from: &User, content: &str) -> Option<Message> {
    let mut state = ctx.state.lock().await;
    if !state.is_current(token) {
        debug!("Dropping reply for closed conversation {}", token.chat_id);
        return None;
    }

    let is_active = state.active.as_deref() == Some(token.chat_id.as_str());
    let reply = Message {
        id: format!("msg-{}", Uuid::new_v4()),
        chat_id: token.chat_id.clone(),
        sender_id: from.id.clone(),
        sender_name: from.name.clone(),
        content: content.to_string(),
        kind: MessageKind::Text,
        attachment: None,
        timestamp: Utc::now(),
        status: DeliveryStatus::Read,
        is_read: is_active,
    };
    state.append(reply.clone());
    info!("{} replied in {}: {}", from.name, token.chat_id, content);

    let mut store = ctx.store.lock().await;
    if let Err(e) = store.touch(&token.chat_id, &reply) {
        warn!("Could not touch chat for reply {}: {}", reply.id, e);
    }
    ctx.emit(ConversationEvent::MessageAppended(reply.clone()));

    if !is_active {
        match store.update_unread(&token.chat_id, 1) {
            Ok(unread_count) => ctx.emit(ConversationEvent::UnreadChanged {
                chat_id: token.chat_id.clone(),
                unread_count,
            }),
            Err(e) => warn!("Could not bump unread count for {}: {}", token.chat_id, e),
        }
    }

    Some(reply)
}
