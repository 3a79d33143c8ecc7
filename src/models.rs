use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender id used for messages written by the local user.
pub const LOCAL_USER_ID: &str = "current-user";
pub const LOCAL_USER_NAME: &str = "You";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    /// Size in bytes
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub is_read: bool,
}

impl Message {
    /// Whether the local user wrote this message.
    pub fn is_outgoing(&self) -> bool {
        self.sender_id == LOCAL_USER_ID
    }

    /// Move the delivery status forward to `target`. Returns false when the
    /// message is already at or past `target`.
    pub fn advance_status(&mut self, target: DeliveryStatus) -> bool {
        self.status.advance_to(target)
    }
}

/// Delivery progress of a message. Variants are ordered; a status only ever
/// moves towards `Read`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sending = 0,   // Accepted locally, not yet acknowledged
    Sent = 1,      // Acknowledged by the (simulated) server
    Delivered = 2, // Reached the recipient's device
    Read = 3,      // Read by recipient
}

impl DeliveryStatus {
    /// The next state, or `None` once `Read` is reached.
    pub fn next(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Sending => Some(DeliveryStatus::Sent),
            DeliveryStatus::Sent => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => Some(DeliveryStatus::Read),
            DeliveryStatus::Read => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == DeliveryStatus::Read
    }

    pub fn advance_to(&mut self, target: DeliveryStatus) -> bool {
        if target > *self {
            *self = target;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub participant: User,
    pub last_message: Message,
    pub unread_count: u32,
    pub timestamp: DateTime<Utc>,
}

impl Chat {
    pub fn new(participant: User, last_message: Message, unread_count: u32) -> Self {
        Chat {
            id: last_message.chat_id.clone(),
            participant,
            timestamp: last_message.timestamp,
            last_message,
            unread_count,
        }
    }
}

/// A transient, user-facing error entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppError {
    pub id: String,
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
