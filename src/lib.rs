// Headless chat state model: chat list, conversations and simulated events
pub mod alerts;
pub mod config;
pub mod conversation;
pub mod error;
pub mod mock_data;
pub mod models;
pub mod random;
pub mod session;
pub mod store;
pub mod validation;

// Re-export main types for convenience
pub use alerts::ErrorAggregator;
pub use config::Config;
pub use conversation::{ConversationEngine, ConversationEvent, EngineSettings};
pub use error::{ChatError, ValidationError};
pub use models::*;
pub use random::{RandomSource, StdRandom};
pub use session::Session;
pub use store::{paginate, ChatPager, ChatSource, ChatStore, MockChatSource, SharedStore};
