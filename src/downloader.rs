//! Downloads generated images from the temporary locator URLs returned by
//! providers.
//!
//! Locators expire quickly (typically within an hour), so the pipeline fetches
//! the bytes right after generation and stages them in a local downloads
//! directory before the canvas upload. The caller owns cleanup of the file.
use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Fetches image bytes over HTTP and stages them on disk.
///
/// Safe for concurrent use: each download issues its own request and writes to
/// a caller-chosen filename.
pub struct Downloader {
    client: Client,
    downloads_dir: PathBuf,
}

/// A downloaded image staged on disk.
#[derive(Debug, Clone)]
pub struct DownloadedArtifact {
    /// Local path of the staged file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// `Content-Type` reported by the server, if any.
    pub content_type: Option<String>,
}

impl Downloader {
    /// Create a downloader staging files under `downloads_dir`. The directory
    /// is created if it does not exist.
    pub fn new(client: Client, downloads_dir: impl Into<PathBuf>) -> Result<Self> {
        let downloads_dir = downloads_dir.into();
        std::fs::create_dir_all(&downloads_dir)?;
        Ok(Downloader {
            client,
            downloads_dir,
        })
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Download `url` and stage it as `{sanitized base_name}{extension}` where
    /// the extension comes from the response's `Content-Type` (defaulting to
    /// `.png`). The body is streamed to disk; a partial file left by a
    /// mid-stream failure is removed before the error returns.
    pub async fn download(&self, url: &str, base_name: &str) -> Result<DownloadedArtifact> {
        if url.is_empty() {
            return Err(Error::Download("url cannot be empty".to_string()));
        }
        if base_name.is_empty() {
            return Err(Error::Download("base filename cannot be empty".to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Download))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadStatus(status.as_u16()));
        }

        let content_type = header_value(&response, CONTENT_TYPE);
        let mut ext = extension_from_content_type(content_type.as_deref().unwrap_or(""));
        if ext.is_empty() {
            ext = ".png";
        }

        let path = self
            .downloads_dir
            .join(format!("{}{}", sanitize_filename(base_name), ext));
        let mut file = fs::File::create(&path).await?;
        // The guard owns the file from here: a mid-stream failure, or the
        // whole future being dropped at a deadline, removes the partial file.
        let mut staged = StagedFile::new(path.clone());

        let mut response = response;
        let mut size: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Download))?
        {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;

        staged.defuse();
        Ok(DownloadedArtifact {
            path,
            size,
            content_type,
        })
    }

    /// Download `url` and return the raw bytes without touching disk.
    pub async fn download_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>)> {
        if url.is_empty() {
            return Err(Error::Download("url cannot be empty".to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Download))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadStatus(status.as_u16()));
        }

        let content_type = header_value(&response, CONTENT_TYPE);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Download))?;

        Ok((bytes.to_vec(), content_type))
    }
}

/// Removes the staged file on drop unless defused. Keeps partial downloads
/// from surviving an error return or a dropped future.
struct StagedFile {
    path: Option<PathBuf>,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        StagedFile { path: Some(path) }
    }

    fn defuse(&mut self) {
        self.path = None;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(err) = std::fs::remove_file(&path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), %err, "failed to remove partial download");
                }
            }
        }
    }
}

fn header_value(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// File extension for a `Content-Type` value. Parameters are stripped and the
/// type case-folded. Unknown `image/*` types map to `.png`; non-image or
/// missing types yield an empty string.
pub fn extension_from_content_type(content_type: &str) -> &'static str {
    if content_type.is_empty() {
        return "";
    }

    let lower = content_type.to_lowercase();
    let mime = lower.split(';').next().unwrap_or("").trim();

    match mime {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        _ if mime.starts_with("image/") => ".png",
        _ => "",
    }
}

/// Replace path separators and reserved/control characters with `_`, cap the
/// length at 200 characters, and fall back to `"image"` for empty input.
/// Idempotent.
pub fn sanitize_filename(filename: &str) -> String {
    const UNSAFE: &[char] = &[
        '/', '\\', ':', '*', '?', '"', '<', '>', '|', '\n', '\r', '\t',
    ];

    let mut result: String = filename
        .chars()
        .map(|c| if UNSAFE.contains(&c) { '_' } else { c })
        .collect();

    if result.chars().count() > 200 {
        result = result.chars().take(200).collect();
    }

    if result.is_empty() {
        result = "image".to_string();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_for_known_image_types() {
        assert_eq!(extension_from_content_type("image/png"), ".png");
        assert_eq!(extension_from_content_type("image/jpeg"), ".jpg");
        assert_eq!(extension_from_content_type("image/jpg"), ".jpg");
        assert_eq!(extension_from_content_type("image/gif"), ".gif");
        assert_eq!(extension_from_content_type("image/webp"), ".webp");
        assert_eq!(extension_from_content_type("image/bmp"), ".bmp");
    }

    #[test]
    fn extension_strips_parameters_and_case_folds() {
        assert_eq!(
            extension_from_content_type("image/PNG; charset=utf-8"),
            ".png"
        );
        assert_eq!(extension_from_content_type("IMAGE/JPEG"), ".jpg");
    }

    #[test]
    fn extension_for_unknown_image_types_defaults_to_png() {
        assert_eq!(extension_from_content_type("image/tiff"), ".png");
        assert_eq!(extension_from_content_type("image/x-custom"), ".png");
    }

    #[test]
    fn extension_for_non_image_types_is_empty() {
        assert_eq!(extension_from_content_type("text/plain"), "");
        assert_eq!(extension_from_content_type("application/json"), "");
        assert_eq!(extension_from_content_type(""), "");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("tab\there\nand\rthere"), "tab_here_and_there");
    }

    #[test]
    fn sanitize_caps_length_at_200_characters() {
        let long = "x".repeat(500);
        let result = sanitize_filename(&long);
        assert_eq!(result.chars().count(), 200);
    }

    #[test]
    fn sanitize_empty_becomes_image() {
        assert_eq!(sanitize_filename(""), "image");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_filename("some/unsafe:name?");
        let twice = sanitize_filename(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_keeps_safe_names_unchanged() {
        assert_eq!(sanitize_filename("generated_abc123"), "generated_abc123");
    }
}
