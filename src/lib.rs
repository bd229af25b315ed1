//! Palaver is a command-line chat client for self-hosted assistant backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the persisted conversation transcript, session
//!   preferences and personas, and the turn logic that reconciles buffered
//!   or streamed backend replies into the transcript.
//! - [`api`] defines the wire payloads and the HTTP client for the backend
//!   endpoints (chat, chat-stream, generate-image, search).
//! - [`cli`] parses arguments and runs the interactive chat loop plus the
//!   one-shot image and search commands.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`) and
//! routes through [`cli::run`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
