pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod message;
pub mod persona;
pub mod preferences;
pub mod session;
pub mod storage;
pub mod transcript;
