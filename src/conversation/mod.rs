// Conversation engine: per-chat timelines and the simulated events that
// mutate them (delivery receipts, replies, typing).
//
// Every timer belongs to an open conversation view. Closing the view aborts
// its tasks, and each task also checks the view generation before touching
// state, so nothing lands in a timeline after teardown.

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::time::Duration;
use uuid::Uuid;

pub mod delivery;
pub mod replies;
pub mod tasks;
pub mod typing;

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::mock_data::CANNED_REPLIES;
use crate::models::{
    Attachment, DeliveryStatus, Message, MessageKind, LOCAL_USER_ID, LOCAL_USER_NAME,
};
use crate::random::RandomSource;
use crate::store::SharedStore;
use crate::validation::validate_outgoing;
use tasks::TaskSet;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What a renderer is told about.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    MessageAppended(Message),
    StatusChanged {
        chat_id: String,
        message_id: String,
        status: DeliveryStatus,
    },
    Typing {
        chat_id: String,
        user_id: String,
        typing: bool,
    },
    UnreadChanged {
        chat_id: String,
        unread_count: u32,
    },
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub delivered_after: Duration,
    /// Measured from the delivered transition
    pub read_after: Duration,
    pub reply_probability: f64,
    pub reply_delay_min: Duration,
    pub reply_delay_max: Duration,
    pub typing_poll: Duration,
    pub typing_probability: f64,
    pub typing_duration: Duration,
    /// Delay before a view's history is first shown
    pub message_load_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        let (reply_delay_min, reply_delay_max) = config.reply_delay_range();
        EngineSettings {
            delivered_after: config.delivered_after(),
            read_after: config.read_after(),
            reply_probability: config.reply_probability,
            reply_delay_min,
            reply_delay_max,
            typing_poll: config.typing_poll(),
            typing_probability: config.typing_probability,
            typing_duration: config.typing_duration(),
            message_load_delay: config.message_load_delay(),
        }
    }
}

/// Identifies one opening of a conversation view. Reopening a chat gets a new
/// generation, so tasks from the earlier view stay inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ViewToken {
    pub(crate) chat_id: String,
    pub(crate) generation: u64,
}

pub(crate) struct EngineState {
    timelines: HashMap<String, Vec<Message>>,
    seeds: HashMap<String, Vec<Message>>,
    open: HashMap<String, u64>,
    /// Chats whose participant is currently shown typing, by user id
    pub(crate) typing: HashMap<String, String>,
    next_generation: u64,
    pub(crate) active: Option<String>,
    pub(crate) rng: Box<dyn RandomSource>,
}

impl EngineState {
    pub(crate) fn is_current(&self, token: &ViewToken) -> bool {
        self.open.get(&token.chat_id) == Some(&token.generation)
    }

    pub(crate) fn message_mut(&mut self, chat_id: &str, message_id: &str) -> Option<&mut Message> {
        self.timelines
            .get_mut(chat_id)?
            .iter_mut()
            .find(|m| m.id == message_id)
    }

    /// Append keeping the timeline ordered by timestamp.
    pub(crate) fn append(&mut self, message: Message) {
        let timeline = self.timelines.entry(message.chat_id.clone()).or_default();
        let out_of_order = timeline
            .last()
            .map(|tail| tail.timestamp > message.timestamp)
            .unwrap_or(false);
        timeline.push(message);
        if out_of_order {
            timeline.sort_by_key(|m| m.timestamp);
        }
    }

    fn ensure_timeline(&mut self, chat_id: &str, last_message: &Message) {
        if self.timelines.contains_key(chat_id) {
            return;
        }
        let mut timeline: Vec<Message> = self
            .seeds
            .remove(chat_id)
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect();
        if !timeline.iter().any(|m| m.id == last_message.id) {
            timeline.push(last_message.clone());
        }
        timeline.sort_by_key(|m| m.timestamp);
        self.timelines.insert(chat_id.to_string(), timeline);
    }

    fn open_view(&mut self, chat_id: &str) -> ViewToken {
        self.next_generation += 1;
        self.open.insert(chat_id.to_string(), self.next_generation);
        ViewToken {
            chat_id: chat_id.to_string(),
            generation: self.next_generation,
        }
    }

    /// Mark incoming messages read; returns the derived unread count (0) and
    /// the updated tail when it changed.
    fn mark_read(&mut self, chat_id: &str) -> (u32, Option<Message>) {
        let Some(timeline) = self.timelines.get_mut(chat_id) else {
            return (0, None);
        };
        let mut tail_changed = false;
        let last = timeline.len().saturating_sub(1);
        for (i, message) in timeline.iter_mut().enumerate() {
            if !message.is_outgoing() && !message.is_read {
                message.is_read = true;
                tail_changed |= i == last;
            }
        }
        let unread = unread_in(timeline);
        (unread, tail_changed.then(|| timeline[last].clone()))
    }
}

/// Incoming messages not yet read.
pub fn unread_in(timeline: &[Message]) -> u32 {
    timeline
        .iter()
        .filter(|m| !m.is_outgoing() && !m.is_read)
        .count() as u32
}

/// Everything a deferred task needs; cheap to clone into each task.
#[derive(Clone)]
pub(crate) struct EngineContext {
    pub(crate) state: Arc<TokioMutex<EngineState>>,
    pub(crate) store: SharedStore,
    pub(crate) settings: Arc<EngineSettings>,
    events: mpsc::Sender<ConversationEvent>,
}

impl EngineContext {
    /// Never blocks; a full or closed channel drops the event.
    pub(crate) fn emit(&self, event: ConversationEvent) {
        if let Err(e) = self.events.try_send(event) {
            debug!("Conversation event not delivered: {}", e);
        }
    }
}

struct ConversationView {
    token: ViewToken,
    tasks: TaskSet,
}

pub struct ConversationEngine {
    ctx: EngineContext,
    views: HashMap<String, ConversationView>,
}

impl ConversationEngine {
    pub fn new(
        store: SharedStore,
        settings: EngineSettings,
        rng: Box<dyn RandomSource>,
        seeds: HashMap<String, Vec<Message>>,
    ) -> (Self, mpsc::Receiver<ConversationEvent>) {
        let (events, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let state = EngineState {
            timelines: HashMap::new(),
            seeds,
            open: HashMap::new(),
            typing: HashMap::new(),
            next_generation: 0,
            active: None,
            rng,
        };
        (
            ConversationEngine {
                ctx: EngineContext {
                    state: Arc::new(TokioMutex::new(state)),
                    store,
                    settings: Arc::new(settings),
                    events,
                },
                views: HashMap::new(),
            },
            event_rx,
        )
    }

    pub fn store(&self) -> &SharedStore {
        &self.ctx.store
    }

    pub fn is_open(&self, chat_id: &str) -> bool {
        self.views.contains_key(chat_id)
    }

    pub fn open_chats(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }

    /// Tasks still waiting to fire for a view.
    pub fn pending_tasks(&mut self, chat_id: &str) -> usize {
        self.views
            .get_mut(chat_id)
            .map(|v| v.tasks.pending())
            .unwrap_or(0)
    }

    pub async fn active(&self) -> Option<String> {
        self.ctx.state.lock().await.active.clone()
    }

    /// The chat's messages, oldest first. Empty for a chat never opened.
    pub async fn timeline(&self, chat_id: &str) -> Vec<Message> {
        self.ctx
            .state
            .lock()
            .await
            .timelines
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Open a conversation view and make it the active one. The first
    /// opening of a chat waits out the history load delay. Opening an
    /// already open view just focuses it.
    pub async fn open(&mut self, chat_id: &str) -> Result<()> {
        if self.views.contains_key(chat_id) {
            return self.focus(chat_id).await;
        }

        if !self.ctx.store.lock().await.contains(chat_id) {
            return Err(ChatError::UnknownChat(chat_id.to_string()));
        }
        let loaded = self.ctx.state.lock().await.timelines.contains_key(chat_id);
        if !loaded && !self.ctx.settings.message_load_delay.is_zero() {
            debug!("Loading history for {}", chat_id);
            tokio::time::sleep(self.ctx.settings.message_load_delay).await;
        }

        let (participant, last_message) = {
            let store = self.ctx.store.lock().await;
            let chat = store
                .get(chat_id)
                .ok_or_else(|| ChatError::UnknownChat(chat_id.to_string()))?;
            (chat.participant.clone(), chat.last_message.clone())
        };

        let token = {
            let mut state = self.ctx.state.lock().await;
            state.ensure_timeline(chat_id, &last_message);
            state.open_view(chat_id)
        };
        info!("Opened conversation {} (view {})", chat_id, token.generation);

        let mut tasks = TaskSet::new();
        tasks.spawn(typing::run(self.ctx.clone(), token.clone(), participant.id));
        self.views
            .insert(chat_id.to_string(), ConversationView { token, tasks });

        self.focus(chat_id).await
    }

    /// Make an open view the active one and mark its incoming messages read.
    pub async fn focus(&mut self, chat_id: &str) -> Result<()> {
        if !self.views.contains_key(chat_id) {
            return Err(ChatError::ConversationClosed(chat_id.to_string()));
        }

        let mut state = self.ctx.state.lock().await;
        state.active = Some(chat_id.to_string());
        let (unread, tail) = state.mark_read(chat_id);

        let mut store = self.ctx.store.lock().await;
        if let Some(tail) = tail {
            store.sync_last_message(&tail);
        }
        store.set_unread(chat_id, unread)?;
        self.ctx.emit(ConversationEvent::UnreadChanged {
            chat_id: chat_id.to_string(),
            unread_count: unread,
        });
        Ok(())
    }

    /// No view is active; open views keep running in the background.
    pub async fn blur(&mut self) {
        self.ctx.state.lock().await.active = None;
    }

    /// Tear a view down. Pending receipts, replies and typing for it are
    /// cancelled. Returns false when it was not open.
    pub async fn close(&mut self, chat_id: &str) -> bool {
        let Some(mut view) = self.views.remove(chat_id) else {
            return false;
        };
        let cancelled = view.tasks.cancel_all();

        let mut state = self.ctx.state.lock().await;
        if state.is_current(&view.token) {
            state.open.remove(chat_id);
        }
        if state.active.as_deref() == Some(chat_id) {
            state.active = None;
        }
        if let Some(user_id) = state.typing.remove(chat_id) {
            self.ctx.emit(ConversationEvent::Typing {
                chat_id: chat_id.to_string(),
                user_id,
                typing: false,
            });
        }
        info!("Closed conversation {} ({} pending tasks cancelled)", chat_id, cancelled);
        true
    }

    pub async fn close_all(&mut self) {
        let chat_ids: Vec<String> = self.views.keys().cloned().collect();
        for chat_id in chat_ids {
            self.close(&chat_id).await;
        }
    }

    /// Validate and append an outgoing message. It is acknowledged (sent)
    /// straight away; delivered/read receipts and possibly a reply are
    /// scheduled on the view. A rejected message changes nothing.
    pub async fn send_message(
        &mut self,
        chat_id: &str,
        content: &str,
        kind: MessageKind,
        attachment: Option<Attachment>,
    ) -> Result<Message> {
        let Some(view) = self.views.get_mut(chat_id) else {
            return Err(ChatError::ConversationClosed(chat_id.to_string()));
        };

        if let Err(e) = validate_outgoing(content, kind, attachment.as_ref()) {
            warn!("Rejected message to {}: {}", chat_id, e);
            return Err(e.into());
        }

        let mut message = Message {
            id: format!("msg-{}", Uuid::new_v4()),
            chat_id: chat_id.to_string(),
            sender_id: LOCAL_USER_ID.to_string(),
            sender_name: LOCAL_USER_NAME.to_string(),
            content: content.to_string(),
            kind,
            attachment,
            timestamp: Utc::now(),
            status: DeliveryStatus::Sending,
            is_read: false,
        };

        let reply = {
            let mut state = self.ctx.state.lock().await;
            if !state.is_current(&view.token) {
                return Err(ChatError::ConversationClosed(chat_id.to_string()));
            }
            let mut store = self.ctx.store.lock().await;
            let participant = store
                .get(chat_id)
                .map(|c| c.participant.clone())
                .ok_or_else(|| ChatError::UnknownChat(chat_id.to_string()))?;

            state.append(message.clone());
            store.touch(chat_id, &message)?;
            self.ctx.emit(ConversationEvent::MessageAppended(message.clone()));

            if let Some(stored) = state.message_mut(chat_id, &message.id) {
                stored.advance_status(DeliveryStatus::Sent);
                message = stored.clone();
            }
            store.sync_last_message(&message);
            self.ctx.emit(ConversationEvent::StatusChanged {
                chat_id: chat_id.to_string(),
                message_id: message.id.clone(),
                status: message.status,
            });

            let settings = &self.ctx.settings;
            if state.rng.chance(settings.reply_probability) {
                let delay = state
                    .rng
                    .duration_between(settings.reply_delay_min, settings.reply_delay_max);
                let text = CANNED_REPLIES[state.rng.index(CANNED_REPLIES.len())];
                Some((participant, text, delay))
            } else {
                None
            }
        };

        info!("Sent message {} to {}", message.id, chat_id);
        delivery::schedule(&self.ctx, &mut view.tasks, &view.token, &message.id);

        if let Some((participant, text, delay)) = reply {
            debug!("Reply from {} scheduled in {:?}", participant.name, delay);
            let ctx = self.ctx.clone();
            let token = view.token.clone();
            view.tasks.spawn_after(delay, async move {
                replies::deliver(&ctx, &token, &participant, text).await;
            });
        }

        Ok(message)
    }
}
