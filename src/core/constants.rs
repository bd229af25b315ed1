//! Fixed names and defaults shared between the library and its front end.

/// Durable slot holding the serialized conversation transcript.
pub const TRANSCRIPT_KEY: &str = "transcript.json";

/// Durable slot holding the configured system prompt.
pub const SYSTEM_PROMPT_KEY: &str = "system-prompt";

/// Durable slot holding the selected persona id.
pub const PERSONA_KEY: &str = "persona";

/// Sampling temperature used when the caller-supplied value is not a
/// finite number. Mirrors the backend's own fallback.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Model requested when none is configured.
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo";

/// Base URL for a locally run backend.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Header prefixed to the synthetic search-context transcript entry.
pub const SEARCH_CONTEXT_HEADER: &str = "Web search context:\n";

/// Result count requested by one-shot web searches unless overridden.
pub const DEFAULT_SEARCH_RESULTS: u32 = 3;
