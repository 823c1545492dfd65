//! Standard OpenAI image generation provider.
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::endpoint::is_local_endpoint;
use crate::error::{Error, Result};
use crate::provider::{first_locator, ImageRequest, ImageResponse, Provider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "dall-e-3";

/// Provider for the standard OpenAI image API.
///
/// Safe for concurrent use; the underlying client pools connections.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    /// Create a provider. Fails if the API key is empty or the endpoint is a
    /// local endpoint, which cannot serve cloud image generation. Empty
    /// `base_url`/`model` fall back to the defaults.
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        base_url: &str,
        model: &str,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Configuration(
                "OpenAI API key is required for image generation".to_string(),
            ));
        }

        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        if is_local_endpoint(base_url) {
            return Err(Error::Configuration(format!(
                "local endpoint ({base_url}) does not support image generation; \
                 configure IMAGE_LLM_URL to use OpenAI or Azure"
            )));
        }

        let model = if model.is_empty() { DEFAULT_MODEL } else { model };

        Ok(OpenAiProvider {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = config.http_client(config.ai_timeout)?;
        Self::new(
            client,
            config.openai_api_key.clone(),
            &config.image_llm_url,
            &config.openai_image_model,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

// Manual impl so the API key never reaches debug output.
impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.is_empty() {
            return Err(Error::Validation("prompt cannot be empty".to_string()));
        }

        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            response_format: "url",
            // DALL-E 2 rejects the style parameter
            style: (self.model == DEFAULT_MODEL).then_some("vivid"),
        };

        let url = format!("{}/images/generations", self.base_url);
        tracing::debug!(%url, model = %self.model, "requesting image generation");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Generation))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(Error::Generation(format!(
                "OpenAI request failed with status {status}: {body}"
            )));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Generation))?;
        first_locator("OpenAI", parsed)
    }
}
