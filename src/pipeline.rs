//! End-to-end image generation pipeline.
//!
//! One invocation walks a sequential phase machine: validate the prompt, show
//! a processing indicator, generate via the configured backend, stage the
//! image on disk (downloading it first on the cloud path), compute placement,
//! upload to the canvas, then clean up. Cleanup — indicator deletion and temp
//! file removal — runs on every exit path, including deadline expiry. On
//! terminal failure a permanent error note is left on the canvas.
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::canvas::CanvasClient;
use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::placement::{calculate_placement_with_config, ParentWidget, PlacementConfig};
use crate::provider::{select_provider, Provider};
use crate::runtime::{sanitize_prompt, validate_prompt, GenerateParams, GenerationRuntime};

/// Phases of one pipeline invocation, in execution order. `Errored` is the
/// absorbing state reachable from every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    IndicatorCreated,
    Generating,
    Downloading,
    Placing,
    Uploading,
    Cleanup,
    Done,
    Errored,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validating => "validating",
            Phase::IndicatorCreated => "indicator-created",
            Phase::Generating => "generating",
            Phase::Downloading => "downloading",
            Phase::Placing => "placing",
            Phase::Uploading => "uploading",
            Phase::Cleanup => "cleanup",
            Phase::Done => "done",
            Phase::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// A run error, tagged with the phase it happened in and the correlation id
/// of the invocation for end-to-end tracing.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed [{correlation_id}]: {source}")]
pub struct PipelineError {
    pub phase: Phase,
    pub correlation_id: String,
    #[source]
    pub source: Error,
}

/// Correlation id source, injected so tests can pin ids.
pub trait IdGenerator: Send + Sync {
    fn correlation_id(&self) -> String;
}

/// Default id source backed by random UUIDs. Wall-clock ids would collide
/// under concurrent invocations.
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn correlation_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Appearance of the ephemeral processing indicator note.
#[derive(Debug, Clone)]
pub struct ProcessingNoteConfig {
    pub title: String,
    pub background_color: String,
    pub text_color: String,
}

impl Default for ProcessingNoteConfig {
    fn default() -> Self {
        ProcessingNoteConfig {
            title: "AI Processing".to_string(),
            background_color: "#8B0000".to_string(),
            text_color: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory for temporary image files.
    pub downloads_dir: PathBuf,
    pub placement: PlacementConfig,
    pub processing_note: ProcessingNoteConfig,
    /// Delete temp artifacts at run end.
    pub cleanup_temp_files: bool,
    /// Deadline applied to the generation and download phases.
    pub request_timeout: Duration,
    /// Declared size of the uploaded widget; also the requested output size
    /// on the local path.
    pub default_width: u32,
    pub default_height: u32,
    /// Inference steps for the local runtime.
    pub default_steps: u32,
    /// Guidance scale for the local runtime.
    pub default_cfg_scale: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            downloads_dir: PathBuf::from("downloads"),
            placement: PlacementConfig::default(),
            processing_note: ProcessingNoteConfig::default(),
            cleanup_temp_files: true,
            request_timeout: Duration::from_secs(120),
            default_width: 1024,
            default_height: 1024,
            default_steps: 20,
            default_cfg_scale: 7.0,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        PipelineConfig {
            downloads_dir: PathBuf::from(&config.downloads_dir),
            placement: PlacementConfig {
                offset_x: config.placement_offset_x,
                offset_y: config.placement_offset_y,
            },
            processing_note: ProcessingNoteConfig {
                title: config.processing_note_title.clone(),
                background_color: config.processing_note_bg_color.clone(),
                text_color: config.processing_note_text_color.clone(),
            },
            cleanup_temp_files: config.cleanup_temp_files,
            request_timeout: config.ai_timeout,
            default_width: config.image_width,
            default_height: config.image_height,
            default_steps: config.image_steps,
            default_cfg_scale: config.image_cfg_scale,
        }
    }
}

/// Generation backend, chosen once at construction.
pub enum Backend {
    /// Cloud provider returning a locator URL, fetched by the downloader.
    Cloud {
        provider: Box<dyn Provider>,
        downloader: Downloader,
    },
    /// In-process runtime producing bytes directly; no download phase.
    Local { runtime: Arc<dyn GenerationRuntime> },
}

/// Result of a fully successful run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Where the artifact was staged. The file is already removed when
    /// cleanup is enabled.
    pub image_path: PathBuf,
    /// Id of the created image widget.
    pub widget_id: String,
    /// Provider locator URL (cloud path only; expires quickly).
    pub locator: Option<String>,
    pub correlation_id: String,
}

/// The pipeline orchestrator. Safe for concurrent use: invocations share no
/// state beyond the downloads-directory lock, which is held only around byte
/// writes, never across network calls.
pub struct Pipeline {
    backend: Backend,
    canvas: Arc<dyn CanvasClient>,
    ids: Box<dyn IdGenerator>,
    config: PipelineConfig,
    dir_lock: Mutex<()>,
}

/// Staged artifact owned by one run. Dropping it removes the file unless
/// persistence was requested, so even a cancelled run releases it.
struct TempArtifact {
    path: PathBuf,
    persist: bool,
}

impl TempArtifact {
    fn new(path: PathBuf, cleanup: bool) -> Self {
        TempArtifact {
            path,
            persist: !cleanup,
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.persist {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), %err, "failed to remove temp image file");
            }
        }
    }
}

impl Pipeline {
    pub fn new(backend: Backend, canvas: Arc<dyn CanvasClient>, config: PipelineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.downloads_dir)?;
        Ok(Pipeline {
            backend,
            canvas,
            ids: Box::new(UuidIds),
            config,
            dir_lock: Mutex::new(()),
        })
    }

    /// Assemble a cloud pipeline from configuration: endpoint classification
    /// picks the provider variant, and the downloader shares the HTTP
    /// settings.
    pub fn from_config(config: &Config, canvas: Arc<dyn CanvasClient>) -> Result<Self> {
        let provider = select_provider(config)?;
        let downloader = Downloader::new(
            config.http_client(config.ai_timeout)?,
            &config.downloads_dir,
        )?;
        Pipeline::new(
            Backend::Cloud {
                provider,
                downloader,
            },
            canvas,
            PipelineConfig::from_config(config),
        )
    }

    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one generation for `prompt`, placing the result relative to
    /// `parent`. A permanent error note is created on the canvas on failure.
    pub async fn generate(
        &self,
        prompt: &str,
        parent: &ParentWidget,
    ) -> std::result::Result<GenerationResult, PipelineError> {
        let correlation_id = self.ids.correlation_id();
        let span = tracing::info_span!(
            "imagegen",
            correlation_id = %correlation_id,
            parent_widget_id = %parent.id,
        );
        self.run(prompt, parent, &correlation_id)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        prompt: &str,
        parent: &ParentWidget,
        correlation_id: &str,
    ) -> std::result::Result<GenerationResult, PipelineError> {
        let fail = |phase: Phase, source: Error| PipelineError {
            phase,
            correlation_id: correlation_id.to_string(),
            source,
        };

        tracing::info!(prompt_preview = %truncate_text(prompt, 50), "starting image generation");

        // Validating: short-circuits before any canvas or network call,
        // except the best-effort error note.
        let prompt = sanitize_prompt(prompt);
        if let Err(err) = validate_prompt(&prompt) {
            tracing::error!(%err, "invalid prompt");
            self.create_error_note(parent, &format!("Invalid prompt: {err}"))
                .await;
            return Err(fail(Phase::Validating, err));
        }

        // IndicatorCreated: best effort, the run continues without live
        // progress feedback if this fails.
        let mut note_id = match self.create_processing_note(parent, "Generating image...").await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(%err, "failed to create processing note");
                None
            }
        };

        let outcome = self
            .run_phases(&prompt, parent, correlation_id, note_id.as_deref())
            .await;

        // Surface a generation failure on the indicator before it goes away.
        if let Err((Phase::Generating, err)) = &outcome {
            if let Some(id) = note_id.as_deref() {
                self.update_processing_note(id, &format!("Generation failed: {err}"))
                    .await;
            }
        }

        // Cleanup: the indicator goes away exactly once on every exit path.
        if let Some(id) = note_id.take() {
            if let Err(err) = self.canvas.delete_note(&id).await {
                tracing::warn!(%err, note_id = %id, "failed to delete processing note");
            }
        }

        match outcome {
            Ok((artifact, widget_id, locator)) => {
                let image_path = artifact.path.clone();
                // Dropping the artifact removes the temp file unless
                // persistence was requested.
                drop(artifact);
                tracing::info!(%widget_id, "image generation complete");
                Ok(GenerationResult {
                    image_path,
                    widget_id,
                    locator,
                    correlation_id: correlation_id.to_string(),
                })
            }
            Err((phase, err)) => {
                tracing::error!(%phase, %err, "image generation failed");
                self.create_error_note(parent, &user_message(phase, &err)).await;
                Err(fail(phase, err))
            }
        }
    }

    /// Fallible middle of the run: generation through upload. Returns the
    /// staged artifact guard so the caller controls when the file disappears.
    async fn run_phases(
        &self,
        prompt: &str,
        parent: &ParentWidget,
        correlation_id: &str,
        note_id: Option<&str>,
    ) -> std::result::Result<(TempArtifact, String, Option<String>), (Phase, Error)> {
        if let Some(id) = note_id {
            self.update_processing_note(id, "Generating image...\nThis may take 10-30 seconds.")
                .await;
        }

        let (artifact, locator) = match &self.backend {
            Backend::Cloud {
                provider,
                downloader,
            } => {
                let locator = self
                    .with_deadline(Phase::Generating, provider.generate(prompt))
                    .await
                    .map_err(|e| (Phase::Generating, e))?;
                tracing::debug!(locator_preview = %truncate_text(&locator, 100), "image generated");

                if let Some(id) = note_id {
                    self.update_processing_note(id, "Downloading generated image...")
                        .await;
                }
                let base_name = format!("generated_{correlation_id}");
                let downloaded = self
                    .with_deadline(Phase::Downloading, downloader.download(&locator, &base_name))
                    .await
                    .map_err(|e| (Phase::Downloading, e))?;
                tracing::debug!(
                    path = %downloaded.path.display(),
                    size = downloaded.size,
                    "image downloaded"
                );

                (
                    TempArtifact::new(downloaded.path, self.config.cleanup_temp_files),
                    Some(locator),
                )
            }
            Backend::Local { runtime } => {
                let params = GenerateParams {
                    prompt: prompt.to_string(),
                    width: self.config.default_width,
                    height: self.config.default_height,
                    steps: self.config.default_steps,
                    cfg_scale: self.config.default_cfg_scale,
                    seed: -1,
                };
                let bytes = self
                    .with_deadline(Phase::Generating, runtime.generate(params))
                    .await
                    .map_err(|e| (Phase::Generating, e))?;
                tracing::debug!(size_bytes = bytes.len(), "image generated");

                let path = self
                    .config
                    .downloads_dir
                    .join(format!("sd_image_{correlation_id}.png"));
                {
                    // Lock scoped to the write into the shared downloads
                    // directory; never held across network calls.
                    let _guard = self.dir_lock.lock().await;
                    tokio::fs::write(&path, &bytes)
                        .await
                        .map_err(|e| (Phase::Generating, Error::Io(e)))?;
                }

                (
                    TempArtifact::new(path, self.config.cleanup_temp_files),
                    None,
                )
            }
        };

        // Placing: pure, cannot fail.
        let (x, y) = calculate_placement_with_config(parent, &self.config.placement);
        tracing::debug!(x, y, "calculated image placement");

        if let Some(id) = note_id {
            self.update_processing_note(id, "Uploading image to canvas...")
                .await;
        }

        let payload = json!({
            "title": format!("AI Generated: {}", truncate_text(prompt, 50)),
            "location": { "x": x, "y": y },
            "size": {
                "width": self.config.default_width as f64,
                "height": self.config.default_height as f64,
            },
            "depth": parent.depth + 10.0,
            "scale": parent.scale / 3.0,
        });

        let response = self
            .canvas
            .create_image(&artifact.path, payload)
            .await
            .map_err(|e| (Phase::Uploading, e))?;
        let widget_id = response
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        tracing::info!(%widget_id, "image uploaded");

        Ok((artifact, widget_id, locator))
    }

    /// Apply the per-run deadline to a suspension point. Elapse aborts the
    /// phase with a cancellation-flavored error; cleanup still runs.
    async fn with_deadline<T>(
        &self,
        phase: Phase,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Cancelled(format!(
                "{phase} did not finish within {:?}",
                self.config.request_timeout
            ))),
        }
    }

    async fn create_processing_note(&self, parent: &ParentWidget, text: &str) -> Result<String> {
        let payload = json!({
            "title": self.config.processing_note.title,
            "text": text,
            "location": {
                "x": parent.location.x + 50.0,
                "y": parent.location.y + 50.0,
            },
            "size": { "width": 300.0, "height": 100.0 },
            "depth": parent.depth + 200.0,
            "scale": parent.scale,
            "background_color": self.config.processing_note.background_color,
            "text_color": self.config.processing_note.text_color,
            "auto_text_color": false,
            "pinned": true,
        });

        let response = self.canvas.create_note(payload).await?;
        let note_id = response
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Upload("processing note response missing id".to_string()))?;
        tracing::debug!(note_id, "created processing note");
        Ok(note_id.to_string())
    }

    async fn update_processing_note(&self, note_id: &str, text: &str) {
        if let Err(err) = self
            .canvas
            .update_note(note_id, json!({ "text": text }))
            .await
        {
            tracing::warn!(%err, note_id, "failed to update processing note");
        }
    }

    /// Create the permanent error note. Failures here are logged, never
    /// escalated, so they cannot mask the primary error.
    async fn create_error_note(&self, parent: &ParentWidget, message: &str) {
        let text = format!(
            "# Image Generation Error\n\n{}\n\nPlease try again or adjust your prompt.",
            truncate_text(message, 500)
        );
        let payload = json!({
            "title": "AI Image Generation Error",
            "text": text,
            "location": {
                "x": parent.location.x + 100.0,
                "y": parent.location.y + 100.0,
            },
            "size": { "width": 400.0, "height": 200.0 },
            "depth": parent.depth + 100.0,
            "scale": parent.scale,
            "background_color": "#FF6B6B",
            "text_color": "#000000",
            "auto_text_color": false,
        });

        if let Err(err) = self.canvas.create_note(payload).await {
            tracing::error!(%err, "failed to create error note");
        }
    }
}

fn user_message(phase: Phase, err: &Error) -> String {
    match phase {
        Phase::Generating => format!("Image generation failed: {err}"),
        Phase::Downloading => format!("Failed to download image: {err}"),
        Phase::Uploading => format!("Failed to upload image: {err}"),
        _ => err.to_string(),
    }
}

/// Truncate to `max_len` characters, appending an ellipsis when there is room
/// for the marker; hard cut otherwise.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return text.chars().take(max_len).collect();
    }
    let mut out: String = text.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate_text("short", 50), "short");
        assert_eq!(truncate_text("exact", 5), "exact");
    }

    #[test]
    fn truncate_appends_ellipsis_when_room_permits() {
        assert_eq!(truncate_text("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_hard_cuts_tiny_bounds() {
        assert_eq!(truncate_text("hello", 3), "hel");
        assert_eq!(truncate_text("hello", 1), "h");
        assert_eq!(truncate_text("hello", 0), "");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn phase_display_names() {
        assert_eq!(Phase::Validating.to_string(), "validating");
        assert_eq!(Phase::Generating.to_string(), "generating");
        assert_eq!(Phase::Errored.to_string(), "errored");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidIds;
        assert_ne!(ids.correlation_id(), ids.correlation_id());
    }
}
