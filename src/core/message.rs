use serde::{Deserialize, Serialize};

/// Role tag attached to every transcript entry.
///
/// `user`, `assistant`, and `search` are the tags this client produces
/// itself. Any other role string found in a stored transcript or a backend
/// reply is carried verbatim in [`Role::Other`] so that a load/save round
/// trip never drops it; front ends skip such entries when rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    /// Synthetic entry carrying web-search context for the surrounding turn.
    Search,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Search => "search",
            Role::Other(tag) => tag,
        }
    }

    /// Whether a front end should display entries with this role.
    pub fn is_renderable(&self) -> bool {
        !matches!(self, Role::Other(_))
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "search" => Role::Search,
            other => Role::Other(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "search" => Role::Search,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
}

impl ConversationEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn search(content: impl Into<String>) -> Self {
        Self::new(Role::Search, content)
    }
}
