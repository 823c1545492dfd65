//! AI image generation pipeline for a collaborative canvas.
//!
//! Turns a text prompt attached to a canvas widget into a rendered image
//! uploaded back onto that canvas.
//!
//! Modules:
//! - `pipeline`: the orchestrator sequencing validation, progress indication,
//!   generation, download, placement, upload, and guaranteed cleanup.
//! - `provider`: pluggable cloud generation backends (OpenAI, Azure).
//! - `runtime`: contract for the in-process local diffusion runtime.
//! - `downloader`: fetches generated images from temporary locator URLs.
//! - `placement`: pure canvas coordinate math.
//! - `endpoint`: pure endpoint classification predicates.
//! - `canvas`: canvas client contract and a thin HTTP implementation.
//! - `config`: env-driven configuration loader.
//! - `error`: common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `Pipeline`,
//! `Downloader`, and `ParentWidget`.
pub mod canvas;
pub mod config;
pub mod downloader;
pub mod endpoint;
pub mod error;
pub mod pipeline;
pub mod placement;
pub mod provider;
pub mod runtime;

pub use canvas::{CanvasClient, HttpCanvasClient};
pub use config::Config;
pub use downloader::{DownloadedArtifact, Downloader};
pub use error::{Error, Result};
pub use pipeline::{
    Backend, GenerationResult, IdGenerator, Phase, Pipeline, PipelineConfig, PipelineError,
    ProcessingNoteConfig, UuidIds,
};
pub use placement::{ParentWidget, WidgetLocation, WidgetSize};
pub use provider::{select_provider, AzureProvider, OpenAiProvider, Provider};
pub use runtime::{GenerateParams, GenerationRuntime};
