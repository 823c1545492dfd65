//! Image generation providers.
//!
//! A provider turns a text prompt into a locator URL for a generated image.
//! Two cloud variants exist: the standard OpenAI API and Azure OpenAI
//! deployments. The variant is chosen once at construction from configuration;
//! the pipeline never type-switches at runtime.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::endpoint::is_azure_endpoint;
use crate::error::{Error, Result};

pub mod azure;
pub mod openai;

pub use azure::AzureProvider;
pub use openai::OpenAiProvider;

/// Capability for generating one image from a prompt.
///
/// The returned locator URL is temporary and should be consumed promptly;
/// providers typically expire it within an hour.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Wire request shared by both cloud variants. Exactly one image, URL
/// response format; `style` is attached only where the backend accepts it.
#[derive(Debug, Serialize)]
pub(crate) struct ImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    pub response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageResponse {
    #[serde(default)]
    pub data: Option<Vec<ImageDatum>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageDatum {
    #[serde(default)]
    pub url: String,
}

/// Pull the first locator out of a response, distinguishing a missing data
/// field, an empty data array, and an empty URL.
pub(crate) fn first_locator(origin: &str, response: ImageResponse) -> Result<String> {
    let data = response
        .data
        .ok_or_else(|| Error::Generation(format!("{origin} returned no data field")))?;
    let first = data
        .into_iter()
        .next()
        .ok_or_else(|| Error::Generation(format!("{origin} returned an empty data array")))?;
    if first.url.is_empty() {
        return Err(Error::Generation(format!(
            "{origin} returned an empty image URL"
        )));
    }
    Ok(first.url)
}

/// Choose and construct the provider for the configured endpoint.
///
/// An Azure-classified endpoint (either the dedicated Azure endpoint or the
/// image endpoint override) selects the Azure variant; everything else gets
/// the standard OpenAI variant.
pub fn select_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let use_azure = (!config.azure_openai_endpoint.is_empty()
        && is_azure_endpoint(&config.azure_openai_endpoint))
        || (!config.image_llm_url.is_empty() && is_azure_endpoint(&config.image_llm_url));

    if use_azure {
        tracing::info!(
            endpoint = %config.azure_openai_endpoint,
            deployment = %config.azure_openai_deployment,
            "using Azure OpenAI provider for image generation"
        );
        Ok(Box::new(AzureProvider::from_config(config)?))
    } else {
        tracing::info!(
            model = %config.openai_image_model,
            "using OpenAI provider for image generation"
        );
        Ok(Box::new(OpenAiProvider::from_config(config)?))
    }
}
