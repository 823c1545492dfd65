//! Contract for the in-process generation runtime, plus prompt hygiene.
//!
//! The runtime itself (model loading, sampling) lives outside this crate; the
//! pipeline only needs a way to turn parameters into raw image bytes.
use async_trait::async_trait;

use crate::error::{Error, Result};

/// Upper bound on prompt length in bytes.
pub const MAX_PROMPT_LENGTH: usize = 10_000;

/// Parameters for one local generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    pub prompt: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Number of inference steps.
    pub steps: u32,
    /// Classifier-free guidance scale.
    pub cfg_scale: f64,
    /// Random seed; negative means pick one at random.
    pub seed: i64,
}

/// Local diffusion runtime capability. Implementations are expected to abort
/// promptly when the calling future is dropped or its deadline expires.
#[async_trait]
pub trait GenerationRuntime: Send + Sync {
    /// Generate one image and return its encoded bytes (PNG).
    async fn generate(&self, params: GenerateParams) -> Result<Vec<u8>>;
}

/// Trim surrounding whitespace from a prompt.
pub fn sanitize_prompt(prompt: &str) -> String {
    prompt.trim().to_string()
}

/// Reject prompts that are empty after trimming, contain NUL bytes, or exceed
/// [`MAX_PROMPT_LENGTH`].
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::Validation("prompt cannot be empty".to_string()));
    }
    if prompt.contains('\0') {
        return Err(Error::Validation("prompt contains null bytes".to_string()));
    }
    if prompt.len() > MAX_PROMPT_LENGTH {
        return Err(Error::Validation(format!(
            "prompt length {} exceeds maximum {}",
            prompt.len(),
            MAX_PROMPT_LENGTH
        )));
    }
    Ok(())
}
