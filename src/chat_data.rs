/// Data structures for the chat connection
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChatError, ChatResult};

/// Connection parameters for one channel, fetched per connect attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatInfo {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub authkey: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl ChatInfo {
    pub fn new(endpoints: Vec<String>, authkey: Option<String>, roles: Option<Vec<String>>) -> ChatInfo {
        ChatInfo {
            endpoints,
            authkey,
            roles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub username: String,
}

/// The acting moderator attached to delete/purge payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModeratorRef {
    pub user_name: String,
    #[serde(default)]
    pub user_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub moderator: Option<ModeratorRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurgeMessage {
    pub user_id: u64,
    #[serde(default)]
    pub moderator: Option<ModeratorRef>,
}

/// Message ids arrive as strings from the chat server but as numbers from
/// some clients; both are passed on as text
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Parse a typed view of an inbound payload without consuming the original
pub fn parse_payload<T: serde::de::DeserializeOwned>(event: InboundEvent, payload: &Value) -> ChatResult<T> {
    T::deserialize(payload).map_err(|e| ChatError::MalformedPayload {
        event: event.name(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

/// Events the manager subscribes to on the chat socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundEvent {
    UserUpdate,
    DeleteMessage,
    PurgeMessage,
    UserTimeout,
    Error,
}

impl InboundEvent {
    pub const ALL: [InboundEvent; 5] = [
        InboundEvent::UserUpdate,
        InboundEvent::DeleteMessage,
        InboundEvent::PurgeMessage,
        InboundEvent::UserTimeout,
        InboundEvent::Error,
    ];

    /// Event name as emitted by the chat client
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::UserUpdate => "UserUpdate",
            InboundEvent::DeleteMessage => "DeleteMessage",
            InboundEvent::PurgeMessage => "PurgeMessage",
            InboundEvent::UserTimeout => "UserTimeout",
            InboundEvent::Error => "error",
        }
    }

    /// Suffix of the outbound notification topic
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            InboundEvent::UserUpdate => "user-update",
            InboundEvent::DeleteMessage => "delete-message",
            InboundEvent::PurgeMessage => "purge-message",
            InboundEvent::UserTimeout => "user-timeout",
            InboundEvent::Error => "error",
        }
    }
}
