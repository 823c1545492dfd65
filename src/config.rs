//! Env-driven configuration.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binary. Defaults are provided for convenience during development,
//! and unparseable numeric values fall back to their defaults with a warning.
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// API key for cloud image generation (OpenAI or Azure).
    pub openai_api_key: String,
    /// Optional override for the image generation endpoint.
    pub image_llm_url: String,
    /// Azure OpenAI endpoint, e.g. `https://your-resource.openai.azure.com/`.
    pub azure_openai_endpoint: String,
    /// Azure deployment name for image generation.
    pub azure_openai_deployment: String,
    /// Azure API version.
    pub azure_openai_api_version: String,
    /// Image model for the standard OpenAI endpoint.
    pub openai_image_model: String,
    /// Timeout applied to generation and download requests.
    pub ai_timeout: Duration,
    /// Directory for temporary image files.
    pub downloads_dir: String,
    /// Skip TLS certificate validation on outbound requests.
    pub allow_insecure_tls: bool,
    /// Default generated image width in pixels.
    pub image_width: u32,
    /// Default generated image height in pixels.
    pub image_height: u32,
    /// Default inference steps for the local runtime.
    pub image_steps: u32,
    /// Default classifier-free guidance scale for the local runtime.
    pub image_cfg_scale: f64,
    /// Delete temp artifacts after upload.
    pub cleanup_temp_files: bool,
    /// Horizontal placement offset from the parent widget.
    pub placement_offset_x: f64,
    /// Vertical placement offset from the parent widget.
    pub placement_offset_y: f64,
    pub processing_note_title: String,
    pub processing_note_bg_color: String,
    pub processing_note_text_color: String,
    /// Canvas server base URL.
    pub canvus_server: String,
    /// Canvas API key.
    pub canvus_api_key: String,
    /// Target canvas id.
    pub canvas_id: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> Self {
        Config {
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            image_llm_url: env_or("IMAGE_LLM_URL", ""),
            azure_openai_endpoint: env_or("AZURE_OPENAI_ENDPOINT", ""),
            azure_openai_deployment: env_or("AZURE_OPENAI_DEPLOYMENT", ""),
            azure_openai_api_version: env_or("AZURE_OPENAI_API_VERSION", "2024-02-15-preview"),
            openai_image_model: env_or("OPENAI_IMAGE_MODEL", "dall-e-3"),
            ai_timeout: Duration::from_secs(env_parse("AI_TIMEOUT_SECS", 120u64)),
            downloads_dir: env_or("DOWNLOADS_DIR", "downloads"),
            allow_insecure_tls: env_parse("ALLOW_INSECURE_TLS", false),
            image_width: env_parse("IMAGE_WIDTH", 1024u32),
            image_height: env_parse("IMAGE_HEIGHT", 1024u32),
            image_steps: env_parse("IMAGE_STEPS", 20u32),
            image_cfg_scale: env_parse("IMAGE_CFG_SCALE", 7.0f64),
            cleanup_temp_files: env_parse("CLEANUP_TEMP_FILES", true),
            placement_offset_x: env_parse("PLACEMENT_OFFSET_X", crate::placement::DEFAULT_OFFSET_X),
            placement_offset_y: env_parse("PLACEMENT_OFFSET_Y", crate::placement::DEFAULT_OFFSET_Y),
            processing_note_title: env_or("PROCESSING_NOTE_TITLE", "AI Processing"),
            processing_note_bg_color: env_or("PROCESSING_NOTE_BG_COLOR", "#8B0000"),
            processing_note_text_color: env_or("PROCESSING_NOTE_TEXT_COLOR", "#FFFFFF"),
            canvus_server: env_or("CANVUS_SERVER", ""),
            canvus_api_key: env_or("CANVUS_API_KEY", ""),
            canvas_id: env_or("CANVAS_ID", ""),
        }
    }

    /// Build an HTTP client honouring the timeout and TLS-trust settings.
    pub fn http_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if self.allow_insecure_tls {
            tracing::warn!("TLS certificate validation is disabled for outbound requests");
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder.build().map_err(Error::Http)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("invalid {key} '{raw}', falling back to {default}");
            default
        }),
        Err(_) => default,
    }
}
