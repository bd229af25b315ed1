//! One chat turn from submission to settled transcript.
//!
//! [`ChatSession::send_turn`] is the reconciliation entrypoint: it builds
//! the wire request, optimistically appends the user entry, and folds the
//! backend's reply into the transcript. The two delivery modes settle the
//! transcript differently on purpose: a buffered turn trusts the history
//! the server returns, while a streamed turn accumulates the reply locally
//! and never replaces anything afterwards.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::client::{BackendClient, BackendError};
use crate::api::{ChatReply, ChatRequest, WireMessage};
use crate::core::chat_stream::drain_into_sink;
use crate::core::constants::{DEFAULT_TEMPERATURE, SEARCH_CONTEXT_HEADER};
use crate::core::message::ConversationEntry;
use crate::core::persona::Persona;
use crate::core::preferences::SessionPreferences;
use crate::core::storage::KeyValueStore;
use crate::core::transcript::TranscriptStore;

/// How the reply body is delivered and reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One JSON payload; the server's returned history is authoritative.
    Buffered,
    /// Chunked text; the reply accumulates into the transcript as it
    /// arrives and nothing replaces the transcript afterwards.
    Streamed,
}

/// Turn state a front end can mirror into a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnStatus {
    #[default]
    Idle,
    AwaitingResponse,
    Streaming,
}

impl TurnStatus {
    pub fn status_text(self) -> Option<&'static str> {
        match self {
            TurnStatus::Idle => None,
            TurnStatus::AwaitingResponse => Some("Thinking…"),
            TurnStatus::Streaming => Some("Streaming reply…"),
        }
    }
}

pub struct ChatSession {
    client: BackendClient,
    transcript: TranscriptStore,
    preferences: SessionPreferences,
    storage: Arc<dyn KeyValueStore>,
    model: String,
    temperature: f64,
    use_search: bool,
    status: Arc<watch::Sender<TurnStatus>>,
}

impl ChatSession {
    /// Restore the transcript and preferences from `storage` and bind the
    /// session to one backend and model.
    pub fn new(client: BackendClient, storage: Arc<dyn KeyValueStore>, model: String) -> Self {
        let transcript = TranscriptStore::load(Arc::clone(&storage));
        let preferences = SessionPreferences::load(storage.as_ref());
        let (status, _) = watch::channel(TurnStatus::Idle);
        Self {
            client,
            transcript,
            preferences,
            storage,
            model,
            temperature: DEFAULT_TEMPERATURE,
            use_search: false,
            status: Arc::new(status),
        }
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn preferences(&self) -> &SessionPreferences {
        &self.preferences
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature;
    }

    pub fn set_use_search(&mut self, use_search: bool) {
        self.use_search = use_search;
    }

    pub fn set_system_prompt(&mut self, system_prompt: String) {
        self.preferences.system_prompt = system_prompt;
        self.preferences.save(self.storage.as_ref());
    }

    pub fn set_persona(&mut self, persona: Persona) {
        self.preferences.persona = persona;
        self.preferences.save(self.storage.as_ref());
    }

    pub fn clear_transcript(&self) {
        self.transcript.clear();
    }

    pub fn status(&self) -> TurnStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TurnStatus> {
        self.status.subscribe()
    }

    /// Run one chat turn. Every failure is rendered into the transcript as
    /// an in-band entry; nothing escapes to the caller.
    pub async fn send_turn(&mut self, utterance: &str, mode: DeliveryMode) {
        let request = self.build_request(utterance);
        self.transcript.append(ConversationEntry::user(utterance));
        self.set_status(TurnStatus::AwaitingResponse);
        match mode {
            DeliveryMode::Buffered => self.run_buffered(&request).await,
            DeliveryMode::Streamed => self.run_streamed(&request).await,
        }
        self.set_status(TurnStatus::Idle);
    }

    fn build_request(&self, utterance: &str) -> ChatRequest {
        // History is the transcript as it stood before this turn's user
        // entry lands; the backend folds the pending pair in itself.
        let history = self
            .transcript
            .snapshot()
            .iter()
            .map(WireMessage::from)
            .collect();
        ChatRequest {
            message: utterance.to_string(),
            history,
            model: self.model.clone(),
            temperature: sanitize_temperature(self.temperature),
            system_prompt: self.preferences.effective_system_prompt(),
            use_search: self.use_search,
        }
    }

    async fn run_buffered(&mut self, request: &ChatRequest) {
        match self.client.chat(request).await {
            Ok(reply) => apply_buffered_reply(&self.transcript, reply),
            Err(err) => self
                .transcript
                .append(ConversationEntry::assistant(err.transcript_text())),
        }
    }

    async fn run_streamed(&mut self, request: &ChatRequest) {
        let response = match self.client.chat_stream(request).await {
            Ok(response) => response,
            Err(err) => {
                self.transcript
                    .append(ConversationEntry::assistant(err.transcript_text()));
                return;
            }
        };
        let sink = self.transcript.begin_assistant_entry();
        self.set_status(TurnStatus::Streaming);
        if let Err(err) = drain_into_sink(&self.transcript, sink, response.bytes_stream()).await {
            self.transcript.append(ConversationEntry::assistant(
                BackendError::from(err).transcript_text(),
            ));
        }
    }

    fn set_status(&self, status: TurnStatus) {
        self.status.send_replace(status);
    }
}

/// Fold a buffered reply into the store. The server history, when present,
/// replaces the transcript wholesale; search snippets land after the
/// replace as one synthetic `search` entry, so they survive it.
fn apply_buffered_reply(transcript: &TranscriptStore, reply: ChatReply) {
    if let Some(history) = reply.history {
        transcript.replace_all(history.into_iter().map(ConversationEntry::from).collect());
    }
    let snippets = reply.search_snippets.unwrap_or_default();
    if !snippets.is_empty() {
        let content = format!("{SEARCH_CONTEXT_HEADER}{}", snippets.join("\n\n"));
        transcript.append(ConversationEntry::search(content));
    }
}

/// Guard the caller-supplied sampling temperature: anything that is not a
/// finite number becomes the backend's default.
pub fn sanitize_temperature(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        DEFAULT_TEMPERATURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use crate::core::storage::MemoryStore;

    fn test_session() -> ChatSession {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
        ChatSession::new(
            BackendClient::new("http://127.0.0.1:9"),
            storage,
            "test-model".to_string(),
        )
    }

    fn wire(role: &str, content: &str) -> WireMessage {
        WireMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn sanitize_temperature_coerces_non_finite_values() {
        assert_eq!(sanitize_temperature(0.9), 0.9);
        assert_eq!(sanitize_temperature(0.0), 0.0);
        assert_eq!(sanitize_temperature(f64::NAN), DEFAULT_TEMPERATURE);
        assert_eq!(sanitize_temperature(f64::INFINITY), DEFAULT_TEMPERATURE);
        assert_eq!(sanitize_temperature(f64::NEG_INFINITY), DEFAULT_TEMPERATURE);
    }

    #[test]
    fn request_history_excludes_the_pending_turn() {
        let session = test_session();
        session.transcript.append(ConversationEntry::user("hi"));
        session
            .transcript
            .append(ConversationEntry::assistant("hello"));

        let request = session.build_request("how are you?");
        assert_eq!(request.message, "how are you?");
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].content, "hello");
        assert_eq!(request.model, "test-model");
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(request.system_prompt, None);
        assert!(!request.use_search);
    }

    #[test]
    fn request_carries_persona_and_search_settings() {
        let mut session = test_session();
        session.set_persona(Persona::Coder);
        session.set_use_search(true);
        session.set_temperature(f64::NAN);

        let request = session.build_request("hi");
        assert_eq!(
            request.system_prompt.as_deref(),
            Persona::Coder.prompt_suffix()
        );
        assert!(request.use_search);
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn buffered_reply_history_is_authoritative() {
        let session = test_session();
        session.transcript.append(ConversationEntry::user("stale"));

        let reply = ChatReply {
            history: Some(vec![
                wire("user", "weather?"),
                wire("assistant", "Sunny, 21°C."),
            ]),
            search_snippets: None,
        };
        apply_buffered_reply(&session.transcript, reply);

        let entries = session.transcript.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ConversationEntry::user("weather?"));
        assert_eq!(entries[1], ConversationEntry::assistant("Sunny, 21°C."));
    }

    #[test]
    fn search_snippets_append_one_entry_after_the_replace() {
        let session = test_session();
        let reply = ChatReply {
            history: Some(vec![
                wire("user", "old"),
                wire("user", "weather?"),
                wire("assistant", "Sunny."),
            ]),
            search_snippets: Some(vec!["snippet A".to_string(), "snippet B".to_string()]),
        };
        apply_buffered_reply(&session.transcript, reply);

        let entries = session.transcript.snapshot();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].role, Role::Search);
        assert_eq!(
            entries[3].content,
            "Web search context:\nsnippet A\n\nsnippet B"
        );
    }

    #[test]
    fn missing_history_leaves_the_transcript_alone() {
        let session = test_session();
        session.transcript.append(ConversationEntry::user("hi"));

        let reply = ChatReply {
            history: None,
            search_snippets: Some(Vec::new()),
        };
        apply_buffered_reply(&session.transcript, reply);

        let entries = session.transcript.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "hi");
    }

    #[test]
    fn status_text_tracks_turn_state() {
        let session = test_session();
        assert_eq!(session.status(), TurnStatus::Idle);
        assert_eq!(TurnStatus::Idle.status_text(), None);
        assert!(TurnStatus::AwaitingResponse.status_text().is_some());
        assert!(TurnStatus::Streaming.status_text().is_some());
    }
}
