use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// A registered account. Usernames double as the email address failure
/// notifications are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub twitter: Option<String>,
}

/// Strip a leading `@` and surrounding whitespace; empty handles become `None`.
pub fn normalize_twitter_handle(handle: &str) -> Option<String> {
    let trimmed = handle.trim().trim_start_matches('@').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
