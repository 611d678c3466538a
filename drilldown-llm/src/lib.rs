//! DRILLDOWN LLM - Options Source Abstraction
//!
//! Provider-agnostic trait for the generative backend that proposes the next
//! level of sub-categories, plus the pieces every provider shares: the
//! prompt and the recovery of a JSON object from free-form model text.

pub mod extract;
pub mod prompt;
pub mod providers;

use async_trait::async_trait;
use drilldown_core::{NavigationRequest, UpstreamError};

pub use drilldown_core::RawPayload;
pub use extract::{extract_json_object, extract_output_text};
pub use prompt::OptionsPrompt;
pub use providers::{OpenAiClient, OpenAiConfig, OpenAiOptionsSource};

// ============================================================================
// OPTIONS SOURCE TRAIT
// ============================================================================

/// Trait for backends that propose options for a navigation request.
/// Implementations must be thread-safe (Send + Sync).
///
/// `fetch` never panics: every failure is returned as a classified
/// [`UpstreamError`] so the caller can fall back.
#[async_trait]
pub trait OptionsSource: Send + Sync {
    /// Identifier used in logs and metrics (e.g. "openai").
    fn source_id(&self) -> &str;

    /// Whether the source has what it needs to make calls at all.
    /// Sources without credentials still answer `fetch` with an error.
    fn is_configured(&self) -> bool {
        true
    }

    /// Ask the backend for a raw, unvalidated payload.
    ///
    /// # Returns
    /// * `Ok(RawPayload)` - A JSON object recovered from the backend output
    /// * `Err(UpstreamError)` - Classified failure
    async fn fetch(&self, request: &NavigationRequest) -> Result<RawPayload, UpstreamError>;
}
