//! OpenAI options source (Responses API)

use super::client::OpenAiClient;
use super::config::OpenAiConfig;
use super::types::ResponsesRequest;
use crate::extract::{extract_json_object, extract_output_text};
use crate::prompt::OptionsPrompt;
use crate::OptionsSource;
use async_trait::async_trait;
use drilldown_core::{truncate_chars, ConfigError, NavigationRequest, RawPayload, UpstreamError};

const SOURCE_ID: &str = "openai";
const RESPONSES_ENDPOINT: &str = "responses";

/// Characters of unparseable model output kept in the error details.
const OUTPUT_PREVIEW_CHARS: usize = 200;

/// Options source backed by the OpenAI Responses API.
///
/// Built without an API key it stays usable: every fetch reports
/// `NoCredential`, which the resolver turns into a stub result.
#[derive(Debug)]
pub struct OpenAiOptionsSource {
    client: Option<OpenAiClient>,
    model: String,
}

impl OpenAiOptionsSource {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ConfigError> {
        let client = if config.has_credential() {
            Some(OpenAiClient::new(config)?)
        } else {
            None
        };
        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&OpenAiConfig::from_env())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl OptionsSource for OpenAiOptionsSource {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn fetch(&self, request: &NavigationRequest) -> Result<RawPayload, UpstreamError> {
        let client = self.client.as_ref().ok_or_else(UpstreamError::no_credential)?;

        let prompt = OptionsPrompt::from_request(request).render();
        let body = ResponsesRequest::json_object(&self.model, prompt);
        let raw = client.post_text(RESPONSES_ENDPOINT, &body).await?;

        let text = extract_output_text(&raw);
        if text.trim().is_empty() {
            return Err(UpstreamError::empty_output());
        }

        extract_json_object(&text)
            .map(RawPayload::new)
            .ok_or_else(|| {
                UpstreamError::malformed_json(format!(
                    "no JSON object in model output: {}",
                    truncate_chars(text.trim(), OUTPUT_PREVIEW_CHARS)
                ))
            })
    }
}
