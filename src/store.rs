// In-memory chat collection with search and progressive pagination

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::Duration;

use crate::error::{ChatError, Result};
use crate::models::{Chat, Message};

pub type SharedStore = Arc<TokioMutex<ChatStore>>;

/// Chats ordered most-recently-active first.
#[derive(Debug, Default, Clone)]
pub struct ChatStore {
    chats: Vec<Chat>,
    revision: u64,
}

impl ChatStore {
    pub fn new(chats: Vec<Chat>) -> Self {
        let mut store = ChatStore { chats, revision: 0 };
        store.sort();
        store
    }

    /// Fetch the initial chat list from `source`, giving up after `timeout`.
    pub async fn load(source: &dyn ChatSource, timeout: Duration) -> Result<ChatStore> {
        match tokio::time::timeout(timeout, source.fetch()).await {
            Ok(Ok(chats)) => {
                info!("Loaded {} chats", chats.len());
                Ok(ChatStore::new(chats))
            }
            Ok(Err(e)) => {
                warn!("Chat source failed: {}", e);
                Err(e)
            }
            Err(_) => {
                warn!("Chat source timed out after {:?}", timeout);
                Err(ChatError::LoadTimeout(timeout.as_millis() as u64))
            }
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(TokioMutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Bumped on every mutation so renderers can tell when to redraw.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    pub fn contains(&self, chat_id: &str) -> bool {
        self.get(chat_id).is_some()
    }

    /// Case-insensitive match on participant name or last message content.
    /// An empty query returns everything.
    pub fn list_chats(&self, query: &str) -> Vec<Chat> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.chats.clone();
        }
        self.chats
            .iter()
            .filter(|chat| {
                chat.participant.name.to_lowercase().contains(&needle)
                    || chat.last_message.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn update_unread(&mut self, chat_id: &str, delta: i64) -> Result<u32> {
        let chat = self.chat_mut(chat_id)?;
        let updated = (chat.unread_count as i64).saturating_add(delta);
        chat.unread_count = updated.clamp(0, u32::MAX as i64) as u32;
        let count = chat.unread_count;
        self.revision += 1;
        Ok(count)
    }

    pub fn set_unread(&mut self, chat_id: &str, count: u32) -> Result<()> {
        self.chat_mut(chat_id)?.unread_count = count;
        self.revision += 1;
        Ok(())
    }

    /// Make `message` the chat's last message and re-sort. A message older
    /// than the current last message leaves it in place.
    pub fn touch(&mut self, chat_id: &str, message: &Message) -> Result<()> {
        let chat = self.chat_mut(chat_id)?;
        if message.timestamp < chat.last_message.timestamp {
            debug!(
                "Not touching {} with message {} older than {}",
                chat_id, message.id, chat.last_message.id
            );
            return Ok(());
        }
        chat.last_message = message.clone();
        chat.timestamp = message.timestamp;
        self.sort();
        self.revision += 1;
        Ok(())
    }

    /// Mirror a changed message into the chat's copy of it, if it is the
    /// chat's last message.
    pub fn sync_last_message(&mut self, message: &Message) -> bool {
        match self.chats.iter_mut().find(|c| c.id == message.chat_id) {
            Some(chat) if chat.last_message.id == message.id => {
                chat.last_message = message.clone();
                self.revision += 1;
                true
            }
            _ => false,
        }
    }

    fn chat_mut(&mut self, chat_id: &str) -> Result<&mut Chat> {
        self.chats
            .iter_mut()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| ChatError::UnknownChat(chat_id.to_string()))
    }

    fn sort(&mut self) {
        // Stable, so equal timestamps keep their relative order
        self.chats.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

/// The next `min(page_size, remaining)` chats after `already_loaded`.
pub fn paginate(filtered: &[Chat], page_size: usize, already_loaded: usize) -> &[Chat] {
    let start = already_loaded.min(filtered.len());
    let end = start.saturating_add(page_size).min(filtered.len());
    &filtered[start..end]
}

/// Infinite-scroll cursor over a filtered chat list. A new query resets the
/// cursor; the first page is revealed as soon as there are results.
#[derive(Debug, Clone)]
pub struct ChatPager {
    query: String,
    page_size: usize,
    loaded: usize,
}

impl ChatPager {
    pub fn new(page_size: usize) -> Self {
        ChatPager {
            query: String::new(),
            page_size: page_size.max(1),
            loaded: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    /// Returns true when the query actually changed and the cursor was reset.
    pub fn set_query(&mut self, query: &str) -> bool {
        if self.query == query {
            return false;
        }
        debug!("Search query changed to '{}', resetting pagination", query);
        self.query = query.to_string();
        self.loaded = 0;
        true
    }

    /// Reveal and return the next page.
    pub fn load_more(&mut self, store: &ChatStore) -> Vec<Chat> {
        let filtered = store.list_chats(&self.query);
        let page = paginate(&filtered, self.page_size, self.loaded).to_vec();
        self.loaded += page.len();
        page
    }

    /// The currently revealed chats, in list order.
    pub fn visible(&mut self, store: &ChatStore) -> Vec<Chat> {
        let filtered = store.list_chats(&self.query);
        if self.loaded == 0 && !filtered.is_empty() {
            self.loaded = self.page_size.min(filtered.len());
        }
        let end = self.loaded.min(filtered.len());
        filtered[..end].to_vec()
    }

    pub fn has_more(&self, store: &ChatStore) -> bool {
        self.loaded < store.list_chats(&self.query).len()
    }
}

/// Where the initial chat list comes from.
#[async_trait]
pub trait ChatSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Chat>>;
}

/// Serves prepared chats after a simulated network delay.
pub struct MockChatSource {
    chats: Vec<Chat>,
    delay: Duration,
}

impl MockChatSource {
    pub fn new(chats: Vec<Chat>, delay: Duration) -> Self {
        MockChatSource { chats, delay }
    }
}

#[async_trait]
impl ChatSource for MockChatSource {
    async fn fetch(&self) -> Result<Vec<Chat>> {
        debug!("Simulating chat fetch ({:?})", self.delay);
        tokio::time::sleep(self.delay).await;
        Ok(self.chats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryStatus, MessageKind, User, UserStatus};
    use chrono::{DateTime, Duration as ChronoDuration, Utc};

    fn message(chat_id: &str, content: &str, at: DateTime<Utc>) -> Message {
        Message {
            id: format!("{}-{}", chat_id, at.timestamp_millis()),
            chat_id: chat_id.to_string(),
            sender_id: "u".to_string(),
            sender_name: "U".to_string(),
            content: content.to_string(),
            kind: MessageKind::Text,
            attachment: None,
            timestamp: at,
            status: DeliveryStatus::Read,
            is_read: true,
        }
    }

    fn chat(id: &str, name: &str, content: &str, at: DateTime<Utc>) -> Chat {
        let user = User {
            id: id.to_string(),
            name: name.to_string(),
            avatar: "https://example.com/a.jpg".to_string(),
            status: UserStatus::Online,
            last_seen: None,
        };
        Chat::new(user, message(id, content, at), 0)
    }

    fn ids(chats: &[Chat]) -> Vec<&str> {
        chats.iter().map(|c| c.id.as_str()).collect()
    }

    fn numbered_store(n: usize) -> ChatStore {
        let base = Utc::now();
        ChatStore::new(
            (0..n)
                .map(|i| {
                    chat(
                        &format!("c{}", i),
                        &format!("Person {}", i),
                        "hi",
                        base - ChronoDuration::minutes(i as i64),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_new_sorts_most_recent_first() {
        let t = Utc::now();
        let store = ChatStore::new(vec![
            chat("a", "Alice", "old", t),
            chat("b", "Bob", "new", t + ChronoDuration::seconds(10)),
        ]);
        assert_eq!(ids(&store.list_chats("")), vec!["b", "a"]);
    }

    #[test]
    fn test_touch_moves_chat_to_front() {
        let t = Utc::now();
        let mut store = ChatStore::new(vec![
            chat("a", "Alice", "old", t),
            chat("b", "Bob", "new", t + ChronoDuration::seconds(10)),
        ]);
        let fresh = message("a", "newest", t + ChronoDuration::seconds(20));
        let before = store.revision();
        store.touch("a", &fresh).unwrap();

        assert_eq!(ids(&store.list_chats("")), vec!["a", "b"]);
        let a = store.get("a").unwrap();
        assert_eq!(a.last_message, fresh);
        assert_eq!(a.timestamp, fresh.timestamp);
        assert!(store.revision() > before);
    }

    #[test]
    fn test_touch_ignores_older_message() {
        let t = Utc::now();
        let mut store = ChatStore::new(vec![chat("a", "Alice", "current", t)]);
        let stale = message("a", "stale", t - ChronoDuration::seconds(5));
        store.touch("a", &stale).unwrap();
        assert_eq!(store.get("a").unwrap().last_message.content, "current");
    }

    #[test]
    fn test_touch_unknown_chat() {
        let mut store = ChatStore::default();
        let msg = message("x", "hi", Utc::now());
        assert!(matches!(store.touch("x", &msg), Err(ChatError::UnknownChat(_))));
    }

    #[test]
    fn test_filter_matches_name_or_content() {
        let t = Utc::now();
        let store = ChatStore::new(vec![
            chat("a", "Sarah Johnson", "See you at lunch", t),
            chat("b", "Mike Chen", "Meeting tomorrow?", t - ChronoDuration::seconds(1)),
        ]);
        assert_eq!(ids(&store.list_chats("SARAH")), vec!["a"]);
        assert_eq!(ids(&store.list_chats("meeting")), vec!["b"]);
        assert_eq!(store.list_chats("").len(), 2);
        assert_eq!(store.list_chats("   ").len(), 2);
        assert!(store.list_chats("nonexistent-xyz").is_empty());
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = ChatStore::default();
        assert!(store.list_chats("").is_empty());
        assert!(store.list_chats("anything").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unread_floors_at_zero() {
        let mut store = ChatStore::new(vec![chat("a", "Alice", "hi", Utc::now())]);
        assert_eq!(store.update_unread("a", 3).unwrap(), 3);
        assert_eq!(store.update_unread("a", -5).unwrap(), 0);
        store.set_unread("a", 2).unwrap();
        assert_eq!(store.get("a").unwrap().unread_count, 2);
        assert!(store.update_unread("missing", 1).is_err());
    }

    #[test]
    fn test_unread_extreme_deltas_saturate() {
        let mut store = ChatStore::new(vec![chat("a", "Alice", "hi", Utc::now())]);
        store.update_unread("a", 5).unwrap();
        assert_eq!(store.update_unread("a", i64::MAX).unwrap(), u32::MAX);
        assert_eq!(store.update_unread("a", i64::MAX).unwrap(), u32::MAX);
        assert_eq!(store.update_unread("a", i64::MIN).unwrap(), 0);
        assert_eq!(store.get("a").unwrap().unread_count, 0);
    }

    #[test]
    fn test_sync_last_message_only_for_matching_id() {
        let t = Utc::now();
        let mut store = ChatStore::new(vec![chat("a", "Alice", "hi", t)]);
        let mut updated = store.get("a").unwrap().last_message.clone();
        updated.is_read = false;
        assert!(store.sync_last_message(&updated));
        assert!(!store.get("a").unwrap().last_message.is_read);

        let other = message("a", "other", t);
        let other = Message { id: "other".to_string(), ..other };
        assert!(!store.sync_last_message(&other));
    }

    #[test]
    fn test_paginate_returns_remaining_slice() {
        let store = numbered_store(45);
        let all = store.list_chats("");
        assert_eq!(paginate(&all, 20, 0).len(), 20);
        assert_eq!(paginate(&all, 20, 20).len(), 20);
        assert_eq!(paginate(&all, 20, 40).len(), 5);
        assert!(paginate(&all, 20, 45).is_empty());
        assert!(paginate(&all, 20, 100).is_empty());
        assert_eq!(paginate(&all, 20, 40)[0].id, "c40");
    }

    #[test]
    fn test_pager_reveals_progressively_and_resets_on_query() {
        let store = numbered_store(45);
        let mut pager = ChatPager::new(20);

        assert_eq!(pager.visible(&store).len(), 20);
        assert!(pager.has_more(&store));
        assert_eq!(pager.load_more(&store).len(), 20);
        assert_eq!(pager.load_more(&store).len(), 5);
        assert!(!pager.has_more(&store));
        assert!(pager.load_more(&store).is_empty());
        assert_eq!(pager.visible(&store).len(), 45);

        assert!(pager.set_query("person 1"));
        assert_eq!(pager.loaded(), 0);
        // "Person 1", "Person 10".."Person 19"
        assert_eq!(pager.visible(&store).len(), 11);
        assert!(!pager.has_more(&store));
        assert!(!pager.set_query("person 1"));
    }

    #[test]
    fn test_pager_empty_results() {
        let store = numbered_store(3);
        let mut pager = ChatPager::new(20);
        pager.set_query("nobody");
        assert!(pager.visible(&store).is_empty());
        assert!(!pager.has_more(&store));
    }

    struct BrokenSource;

    #[async_trait]
    impl ChatSource for BrokenSource {
        async fn fetch(&self) -> Result<Vec<Chat>> {
            Err(ChatError::Load("backend unavailable".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_from_mock_source() {
        let chats = numbered_store(4).list_chats("");
        let source = MockChatSource::new(chats, Duration::from_millis(1500));
        let store = ChatStore::load(&source, Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_times_out() {
        let source = MockChatSource::new(Vec::new(), Duration::from_secs(30));
        let result = ChatStore::load(&source, Duration::from_secs(10)).await;
        assert!(matches!(result, Err(ChatError::LoadTimeout(10_000))));
    }

    #[tokio::test]
    async fn test_load_propagates_source_error() {
        let result = ChatStore::load(&BrokenSource, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ChatError::Load(_))));
    }
}
