// Mock users, messages and chats used to seed a session.
//
// Everything is derived from the `now` passed in, so the output is
// deterministic apart from the unread counts drawn from the random source.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::HashMap;

use crate::models::{
    Chat, DeliveryStatus, Message, MessageKind, User, UserStatus, LOCAL_USER_ID, LOCAL_USER_NAME,
};
use crate::random::RandomSource;

const AVATAR_BASE: &str = "https://images.pexels.com/photos";

// (id, name, pexels photo id, status)
const USERS: [(&str, &str, u32, UserStatus); 10] = [
    ("1", "Sarah Johnson", 774909, UserStatus::Online),
    ("2", "Mike Chen", 697509, UserStatus::Online),
    ("3", "Emma Wilson", 1239291, UserStatus::Away),
    ("4", "David Rodriguez", 1222271, UserStatus::Offline),
    ("5", "Lisa Anderson", 1130626, UserStatus::Online),
    ("6", "Alex Thompson", 1300402, UserStatus::Online),
    ("7", "Jessica Brown", 415829, UserStatus::Away),
    ("8", "Ryan Davis", 1559486, UserStatus::Online),
    ("9", "Amanda Garcia", 1181519, UserStatus::Offline),
    ("10", "Kevin Martinez", 1516680, UserStatus::Online),
];

// (user id, content, minutes ago, already read)
const LAST_MESSAGES: [(&str, &str, i64, bool); 10] = [
    ("1", "Hey! How are you doing today?", 5, false),
    ("2", "Can we schedule the meeting for tomorrow?", 15, false),
    ("3", "Thanks for the help with the project! 🙏", 30, true),
    ("4", "Let me know when you're free to chat", 60, true),
    ("5", "The presentation looks great! Well done 👏", 120, false),
    ("6", "Are we still on for lunch today?", 180, true),
    ("7", "I'll send over the documents shortly", 240, true),
    ("8", "Great job on the presentation! 🎉", 360, true),
    ("9", "Let's catch up soon over coffee ☕", 720, true),
    ("10", "Thanks for the quick response!", 1440, true),
];

// Follow-up exchange in the first chat: (from local user, content, minutes ago)
const SARAH_FOLLOW_UP: [(bool, &str, i64); 2] = [
    (true, "I'm doing great, thanks for asking!", 4),
    (false, "That's wonderful to hear! 😊", 3),
];

/// Canned replies used by the simulated participant.
pub const CANNED_REPLIES: [&str; 8] = [
    "That sounds great!",
    "I agree with you",
    "Let me think about it",
    "Thanks for sharing that",
    "Interesting point!",
    "I'll get back to you on that",
    "Sounds good to me",
    "That makes sense",
];

pub struct MockData {
    pub users: Vec<User>,
    pub chats: Vec<Chat>,
    /// Seed timeline per chat id, oldest first.
    pub history: HashMap<String, Vec<Message>>,
}

pub fn mock_users(now: DateTime<Utc>) -> Vec<User> {
    USERS
        .iter()
        .map(|(id, name, photo, status)| {
            let last_seen = match status {
                UserStatus::Online => now,
                UserStatus::Away => now - Duration::minutes(30),
                UserStatus::Offline => now - Duration::hours(2),
            };
            User {
                id: id.to_string(),
                name: name.to_string(),
                avatar: format!(
                    "{}/{}/pexels-photo-{}.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop",
                    AVATAR_BASE, photo, photo
                ),
                status: *status,
                last_seen: Some(last_seen),
            }
        })
        .collect()
}

pub fn chat_id_for(user_id: &str) -> String {
    format!("chat-{}", user_id)
}

pub fn generate(now: DateTime<Utc>, rng: &mut dyn RandomSource) -> MockData {
    let users = mock_users(now);
    let mut history: HashMap<String, Vec<Message>> = HashMap::new();
    let mut next_id = 1u32;

    for (user_id, content, minutes_ago, read) in LAST_MESSAGES.iter() {
        let Some(user) = users.iter().find(|u| u.id == *user_id) else {
            continue;
        };
        let msg = incoming(
            next_id,
            user,
            content,
            now - Duration::minutes(*minutes_ago),
            *read,
        );
        next_id += 1;
        history.entry(msg.chat_id.clone()).or_default().push(msg);
    }

    if let Some(sarah) = users.first() {
        for (from_me, content, minutes_ago) in SARAH_FOLLOW_UP.iter() {
            let timestamp = now - Duration::minutes(*minutes_ago);
            let msg = if *from_me {
                Message {
                    id: next_id.to_string(),
                    chat_id: chat_id_for(&sarah.id),
                    sender_id: LOCAL_USER_ID.to_string(),
                    sender_name: LOCAL_USER_NAME.to_string(),
                    content: content.to_string(),
                    kind: MessageKind::Text,
                    attachment: None,
                    timestamp,
                    status: DeliveryStatus::Read,
                    is_read: true,
                }
            } else {
                incoming(next_id, sarah, content, timestamp, false)
            };
            next_id += 1;
            history.entry(msg.chat_id.clone()).or_default().push(msg);
        }
    }

    let mut chats = Vec::with_capacity(users.len());
    for user in &users {
        let Some(timeline) = history.get_mut(&chat_id_for(&user.id)) else {
            continue;
        };
        timeline.sort_by_key(|m| m.timestamp);
        let Some(last) = timeline.last() else {
            continue;
        };
        // Mock flavour: unread count is drawn independently of the history
        let unread = if last.is_read {
            0
        } else {
            rng.index(5) as u32 + 1
        };
        chats.push(Chat::new(user.clone(), last.clone(), unread));
    }
    chats.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    debug!(
        "Generated {} mock users, {} chats, {} messages",
        users.len(),
        chats.len(),
        history.values().map(Vec::len).sum::<usize>()
    );

    MockData {
        users,
        chats,
        history,
    }
}

fn incoming(id: u32, from: &User, content: &str, timestamp: DateTime<Utc>, read: bool) -> Message {
    Message {
        id: id.to_string(),
        chat_id: chat_id_for(&from.id),
        sender_id: from.id.clone(),
        sender_name: from.name.clone(),
        content: content.to_string(),
        kind: MessageKind::Text,
        attachment: None,
        timestamp,
        status: DeliveryStatus::Read,
        is_read: read,
    }
}
