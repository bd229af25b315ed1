//! Wire payloads exchanged with the assistant backend.

use serde::{Deserialize, Serialize};

use crate::core::message::{ConversationEntry, Role};

/// One `{role, content}` message as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Body for `POST /chat` and `POST /chat-stream`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Conversation context as it stood before this turn's user entry.
    pub history: Vec<WireMessage>,
    pub model: String,
    pub temperature: f64,
    /// `null` lets the backend fall back to its own default prompt.
    pub system_prompt: Option<String>,
    pub use_search: bool,
}

/// Successful `POST /chat` body. `history` is the server's canonical
/// post-turn transcript; when it is missing the client keeps its own.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub history: Option<Vec<WireMessage>>,
    pub search_snippets: Option<Vec<String>>,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<String>,
}

/// Body for `POST /generate-image`.
#[derive(Debug, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageReply {
    pub url: String,
}

/// Body for `POST /search`.
#[derive(Debug, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchReply {
    pub results: Vec<String>,
}

impl From<&ConversationEntry> for WireMessage {
    fn from(entry: &ConversationEntry) -> Self {
        Self {
            role: entry.role.as_str().to_string(),
            content: entry.content.clone(),
        }
    }
}

impl From<WireMessage> for ConversationEntry {
    fn from(message: WireMessage) -> Self {
        Self {
            role: Role::from(message.role),
            content: message.content,
        }
    }
}

pub mod client;
