// Common test utilities for integration tests
// This module contains shared code for all integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Once;

use chrono::{DateTime, Utc};
use log::{info, LevelFilter};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use chatsapp::{
    Chat, ChatStore, ConversationEngine, ConversationEvent, DeliveryStatus, EngineSettings,
    Message, MessageKind, RandomSource, User, UserStatus,
};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Hands out queued values first, then repeats `fallback`.
pub struct ScriptedRandom {
    queue: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(values: &[f64], fallback: f64) -> Self {
        ScriptedRandom {
            queue: values.iter().copied().collect(),
            fallback,
        }
    }

    /// Never replies, never types.
    pub fn quiet() -> Self {
        ScriptedRandom::new(&[], 0.99)
    }

    /// The next send gets a reply after `delay_fraction` of the reply window,
    /// using the first canned response.
    pub fn reply_once(delay_fraction: f64) -> Self {
        ScriptedRandom::new(&[0.0, delay_fraction, 0.0], 0.99)
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&mut self) -> f64 {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        avatar: format!("https://example.com/{}.jpg", id),
        status: UserStatus::Online,
        last_seen: None,
    }
}

pub fn incoming(chat_id: &str, from: &User, content: &str, at: DateTime<Utc>, read: bool) -> Message {
    Message {
        id: format!("{}-{}", chat_id, at.timestamp_millis()),
        chat_id: chat_id.to_string(),
        sender_id: from.id.clone(),
        sender_name: from.name.clone(),
        content: content.to_string(),
        kind: MessageKind::Text,
        attachment: None,
        timestamp: at,
        status: DeliveryStatus::Read,
        is_read: read,
    }
}

pub fn chat_at(id: &str, name: &str, content: &str, at: DateTime<Utc>) -> Chat {
    let participant = user(id, name);
    let message = incoming(id, &participant, content, at, true);
    Chat::new(participant, message, 0)
}

/// Two chats, "alice" newest, over a fresh store.
pub fn two_chat_engine(
    rng: ScriptedRandom,
) -> (ConversationEngine, mpsc::Receiver<ConversationEvent>) {
    let now = Utc::now();
    let store = ChatStore::new(vec![
        chat_at("alice", "Alice Walker", "See you soon", now - chrono::Duration::minutes(1)),
        chat_at("bob", "Bob Stone", "Meeting notes attached", now - chrono::Duration::minutes(5)),
    ])
    .into_shared();
    ConversationEngine::new(store, EngineSettings::default(), Box::new(rng), HashMap::new())
}

/// Drop everything already queued on the event channel.
pub fn drain(rx: &mut mpsc::Receiver<ConversationEvent>) -> Vec<ConversationEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = rx.try_recv() {
        drained.push(event);
    }
    drained
}

/// Wait for an event matching the predicate with timeout
pub async fn wait_for_event(
    rx: &mut mpsc::Receiver<ConversationEvent>,
    predicate: impl Fn(&ConversationEvent) -> bool,
    timeout_secs: u64,
) -> Option<ConversationEvent> {
    info!("Waiting for event...");
    timeout(Duration::from_secs(timeout_secs), async {
        while let Some(event) = rx.recv().await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

pub async fn status_of(engine: &ConversationEngine, chat_id: &str, message_id: &str) -> DeliveryStatus {
    engine
        .timeline(chat_id)
        .await
        .into_iter()
        .find(|m| m.id == message_id)
        .map(|m| m.status)
        .expect("message missing from timeline")
}
