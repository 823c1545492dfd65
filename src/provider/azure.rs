//! Azure OpenAI image generation provider.
//!
//! Azure differs from the standard API in two ways that matter here: requests
//! address a deployment name rather than a model, and parameter support varies
//! by deployment family.
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::endpoint::is_azure_endpoint;
use crate::error::{Error, Result};
use crate::provider::{first_locator, ImageRequest, ImageResponse, Provider};

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Provider for Azure OpenAI image deployments.
///
/// Safe for concurrent use; the underlying client pools connections.
pub struct AzureProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl AzureProvider {
    /// Create a provider. Fails if the API key is empty, the endpoint is empty
    /// or not Azure-classified, or the deployment name is empty.
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        endpoint: &str,
        deployment: &str,
        api_version: &str,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Configuration(
                "API key is required for Azure image generation".to_string(),
            ));
        }
        if endpoint.is_empty() {
            return Err(Error::Configuration(
                "Azure endpoint is required; set IMAGE_LLM_URL or AZURE_OPENAI_ENDPOINT"
                    .to_string(),
            ));
        }
        if !is_azure_endpoint(endpoint) {
            return Err(Error::Configuration(format!(
                "endpoint ({endpoint}) is not an Azure OpenAI endpoint"
            )));
        }
        if deployment.is_empty() {
            return Err(Error::Configuration(
                "Azure deployment name is required; set AZURE_OPENAI_DEPLOYMENT".to_string(),
            ));
        }

        let api_version = if api_version.is_empty() {
            DEFAULT_API_VERSION
        } else {
            api_version
        };

        Ok(AzureProvider {
            client,
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment: deployment.to_string(),
            api_version: api_version.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        // The image endpoint override wins over the dedicated Azure endpoint.
        let endpoint = if !config.image_llm_url.is_empty() {
            &config.image_llm_url
        } else {
            &config.azure_openai_endpoint
        };
        let client = config.http_client(config.ai_timeout)?;
        Self::new(
            client,
            config.openai_api_key.clone(),
            endpoint,
            &config.azure_openai_deployment,
            &config.azure_openai_api_version,
        )
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

// Manual impl so the API key never reaches debug output.
impl fmt::Debug for AzureProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureProvider")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for AzureProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.is_empty() {
            return Err(Error::Validation("prompt cannot be empty".to_string()));
        }

        let request = ImageRequest {
            model: &self.deployment,
            prompt,
            n: 1,
            response_format: "url",
            // gpt-image-1 and other non-DALL-E deployments reject the style
            // parameter, so omission is required for them.
            style: is_dalle_deployment(&self.deployment).then_some("vivid"),
        };

        let url = format!(
            "{}/openai/deployments/{}/images/generations?api-version={}",
            self.endpoint, self.deployment, self.api_version
        );
        tracing::debug!(deployment = %self.deployment, "requesting image generation");

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
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
                "Azure request failed with status {status}: {body}"
            )));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Generation))?;
        first_locator("Azure", parsed)
    }
}

/// Whether a deployment name looks like a DALL-E model, which accepts the
/// style parameter.
pub(crate) fn is_dalle_deployment(deployment: &str) -> bool {
    let lower = deployment.to_lowercase();
    lower.contains("dalle3") || lower.contains("dall-e") || lower.contains("dalle-3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_api_key() {
        let err = AzureProvider::new(
            Client::new(),
            "",
            "https://myresource.openai.azure.com",
            "dalle3",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn construction_requires_azure_endpoint() {
        let err = AzureProvider::new(Client::new(), "key", "", "dalle3", "").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = AzureProvider::new(
            Client::new(),
            "key",
            "https://api.openai.com/v1",
            "dalle3",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn construction_requires_deployment() {
        let err = AzureProvider::new(
            Client::new(),
            "key",
            "https://myresource.openai.azure.com",
            "",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn construction_applies_version_default_and_trims_endpoint() {
        let provider = AzureProvider::new(
            Client::new(),
            "key",
            "https://myresource.openai.azure.com/",
            "dalle3",
            "",
        )
        .unwrap();
        assert_eq!(provider.endpoint, "https://myresource.openai.azure.com");
        assert_eq!(provider.api_version, DEFAULT_API_VERSION);
        assert_eq!(provider.deployment(), "dalle3");
    }

    #[test]
    fn dalle_deployment_detection() {
        assert!(is_dalle_deployment("dalle3"));
        assert!(is_dalle_deployment("Dalle3-prod"));
        assert!(is_dalle_deployment("dall-e-3"));
        assert!(is_dalle_deployment("my-dalle-3"));
        assert!(!is_dalle_deployment("gpt-image-1"));
        assert!(!is_dalle_deployment(""));
    }

    #[tokio::test]
    async fn empty_prompt_fails_before_any_network_call() {
        let provider = AzureProvider::new(
            Client::new(),
            "key",
            "https://myresource.openai.azure.com",
            "dalle3",
            "",
        )
        .unwrap();
        let err = provider.generate("").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
