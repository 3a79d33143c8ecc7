// Simulated "participant is typing" signal
//
// Purely a presentation hint: it is emitted as an event and never stored in
// the timeline.

use log::{debug, warn};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{ConversationEvent, EngineContext, ViewToken};

/// Poll until the view closes (the owning task set aborts this future).
/// A raised signal is recorded in the engine state so closing the view can
/// lower it.
pub(crate) async fn run(ctx: EngineContext, token: ViewToken, participant_id: String) {
    let poll = ctx.settings.typing_poll;
    if poll.is_zero() {
        warn!("Typing poll period is zero, no typing for {}", token.chat_id);
        return;
    }
    let mut ticker = interval_at(Instant::now() + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        {
            let mut state = ctx.state.lock().await;
            if !state.is_current(&token) {
                return;
            }
            if !state.rng.chance(ctx.settings.typing_probability) {
                continue;
            }
            debug!("{} is typing in {}", participant_id, token.chat_id);
            state
                .typing
                .insert(token.chat_id.clone(), participant_id.clone());
            ctx.emit(ConversationEvent::Typing {
                chat_id: token.chat_id.clone(),
                user_id: participant_id.clone(),
                typing: true,
            });
        }

        tokio::time::sleep(ctx.settings.typing_duration).await;

        let mut state = ctx.state.lock().await;
        if !state.is_current(&token) {
            return;
        }
        if state.typing.remove(&token.chat_id).is_some() {
            ctx.emit(ConversationEvent::Typing {
                chat_id: token.chat_id.clone(),
                user_id: participant_id.clone(),
                typing: false,
            });
        }
    }
}
