/// Error types for the chat connection layer
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    /// An API lookup (chat info, user info) failed or returned garbage
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// The chat socket rejected the auth handshake
    #[error("chat auth failed: {0}")]
    Auth(String),

    /// An inbound payload did not have the expected shape
    #[error("malformed {event} payload: {reason}")]
    MalformedPayload { event: &'static str, reason: String },

    /// A call across the JS bridge threw
    #[error("js bridge error: {0}")]
    Bridge(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
