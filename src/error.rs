//! Error types for the chat state model.

use thiserror::Error;

/// Reasons an outgoing message is rejected before it touches any timeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message content is empty")]
    EmptyContent,

    #[error("Message content is {len} characters, limit is {max}")]
    ContentTooLong { len: usize, max: usize },

    #[error("A {0} message needs an attachment")]
    MissingAttachment(&'static str),

    #[error("File '{name}' is {size} bytes, limit is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("File '{name}' has unsupported type {mime}")]
    UnsupportedType { name: String, mime: String },

    #[error("Invalid user record: {0}")]
    InvalidUser(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Initial data fetch failed
    #[error("Failed to load chats: {0}")]
    Load(String),

    #[error("Loading chats timed out after {0} ms")]
    LoadTimeout(u64),

    #[error("Unknown chat: {0}")]
    UnknownChat(String),

    #[error("Conversation {0} is not open")]
    ConversationClosed(String),

    /// Non-critical environment setup failure
    #[error("Metadata setup failed: {0}")]
    MetadataSetup(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Short code shown on user-facing banners.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "VALIDATION_ERROR",
            ChatError::Load(_) | ChatError::LoadTimeout(_) => "LOAD_ERROR",
            ChatError::UnknownChat(_) => "UNKNOWN_CHAT",
            ChatError::ConversationClosed(_) => "CONVERSATION_CLOSED",
            ChatError::MetadataSetup(_) => "METADATA_SETUP_ERROR",
            ChatError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
