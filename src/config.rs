/// Runtime configuration for the chat relay
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};

pub const DEFAULT_EVENT_NAMESPACE: &str = "elixr:chat";

/// Roles that grant elevated handling of delete/purge events
pub const DEFAULT_MODERATOR_ROLES: [&str; 3] = ["Mod", "ChannelEditor", "Owner"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatConfig {
    /// Prefix for every outbound notification topic
    pub event_namespace: String,
    pub moderator_roles: Vec<String>,
}

impl ChatConfig {
    pub fn new() -> Self {
        ChatConfig {
            event_namespace: DEFAULT_EVENT_NAMESPACE.to_string(),
            moderator_roles: DEFAULT_MODERATOR_ROLES
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }

    /// Parse a config from a JSON value, filling missing fields with defaults
    pub fn from_json(value: serde_json::Value) -> ChatResult<Self> {
        let config: ChatConfig = serde_json::from_value(value)
            .map_err(|e| ChatError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChatResult<()> {
        if self.event_namespace.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "event namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Full topic name for an event suffix, e.g. `elixr:chat:user-update`
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}:{}", self.event_namespace, suffix)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
