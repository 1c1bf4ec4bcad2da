/// Connect-time decisions: moderator status, auth identity, endpoint filtering

use crate::chat_data::{ModeratorRef, PurgeMessage};

/// True when any of the user's roles is one of the moderator roles
pub fn is_moderator(roles: Option<&[String]>, moderator_roles: &[String]) -> bool {
    roles.is_some_and(|roles| roles.iter().any(|role| moderator_roles.contains(role)))
}

/// Authentication needs both a user and a key; otherwise connect anonymously
pub fn resolve_auth_identity(user_id: Option<u64>, authkey: Option<&str>) -> Option<u64> {
    authkey.and(user_id)
}

/// Keep endpoints that parse as URLs, in their original order
pub fn usable_endpoints(endpoints: &[String]) -> Vec<String> {
    endpoints
        .iter()
        .filter(|endpoint| match url::Url::parse(endpoint) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Dropping chat endpoint {:?}: {}", endpoint, e);
                false
            }
        })
        .cloned()
        .collect()
}

/// What a purge means for the chat feed
#[derive(Debug, Clone, PartialEq)]
pub enum PurgeAction {
    Timeout { username: String, moderator: String },
    Ban { username: String },
}

/// A purge with an acting moderator is a timeout, without one it is a ban
pub fn classify_purge(purge: &PurgeMessage, username: String) -> PurgeAction {
    match &purge.moderator {
        Some(ModeratorRef { user_name, .. }) => PurgeAction::Timeout {
            username,
            moderator: user_name.clone(),
        },
        None => PurgeAction::Ban { username },
    }
}
