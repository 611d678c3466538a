//! Options source implementations
//!
//! Concrete implementations of the [`OptionsSource`](crate::OptionsSource)
//! trait for hosted model APIs.

pub mod openai;

pub use openai::{OpenAiClient, OpenAiConfig, OpenAiOptionsSource};
