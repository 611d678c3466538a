//! OpenAI provider implementation
//!
//! Calls the Responses API in JSON-object mode and hands back the recovered
//! object as a raw payload.

pub mod client;
pub mod config;
pub mod source;
pub mod types;

pub use client::OpenAiClient;
pub use config::OpenAiConfig;
pub use source::OpenAiOptionsSource;
