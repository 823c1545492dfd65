//! Canvas client contract consumed by the pipeline, plus a thin HTTP
//! implementation used by the binary.
//!
//! The pipeline depends only on the trait; the REST details stay out of the
//! orchestration logic and out of the tests.
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde_json::Value;

use crate::error::{Error, Result};

/// Operations the pipeline performs against the canvas. Implementations are
/// expected to be safe for concurrent use.
#[async_trait]
pub trait CanvasClient: Send + Sync {
    /// Create a note widget; the response carries the new widget's `id`.
    async fn create_note(&self, payload: Value) -> Result<Value>;

    /// Patch an existing note.
    async fn update_note(&self, note_id: &str, payload: Value) -> Result<Value>;

    /// Delete a note.
    async fn delete_note(&self, note_id: &str) -> Result<()>;

    /// Upload a local image file as a new image widget; the response carries
    /// the new widget's `id`.
    async fn create_image(&self, local_path: &Path, payload: Value) -> Result<Value>;
}

/// Thin REST client for a Canvus-style canvas server.
pub struct HttpCanvasClient {
    client: Client,
    base_url: String,
    api_key: String,
    canvas_id: String,
}

impl HttpCanvasClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        canvas_id: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(Error::Configuration(
                "canvas server URL is required; set CANVUS_SERVER".to_string(),
            ));
        }
        let canvas_id = canvas_id.into();
        if canvas_id.is_empty() {
            return Err(Error::Configuration(
                "canvas id is required; set CANVAS_ID".to_string(),
            ));
        }
        Ok(HttpCanvasClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            canvas_id,
        })
    }

    fn widget_url(&self, kind: &str) -> String {
        format!(
            "{}/api/v1/canvases/{}/{}",
            self.base_url, self.canvas_id, kind
        )
    }

    async fn json_or_error(&self, response: reqwest::Response) -> Result<Value> {
        if response.status().is_success() {
            response.json().await.map_err(Error::Http)
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            Err(Error::Upload(format!(
                "canvas request failed with status {status}: {body}"
            )))
        }
    }
}

// Manual impl so the access token never reaches debug output.
impl fmt::Debug for HttpCanvasClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCanvasClient")
            .field("base_url", &self.base_url)
            .field("canvas_id", &self.canvas_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CanvasClient for HttpCanvasClient {
    async fn create_note(&self, payload: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.widget_url("notes"))
            .header("Private-Token", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Upload))?;
        self.json_or_error(response).await
    }

    async fn update_note(&self, note_id: &str, payload: Value) -> Result<Value> {
        let url = format!("{}/{}", self.widget_url("notes"), note_id);
        let response = self
            .client
            .patch(&url)
            .header("Private-Token", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Upload))?;
        self.json_or_error(response).await
    }

    async fn delete_note(&self, note_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.widget_url("notes"), note_id);
        let response = self
            .client
            .delete(&url)
            .header("Private-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Upload))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Upload(format!(
                "canvas note deletion failed with status {}",
                response.status()
            )))
        }
    }

    async fn create_image(&self, local_path: &Path, payload: Value) -> Result<Value> {
        let bytes = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.png")
            .to_string();

        let form = multipart::Form::new()
            .text("json", payload.to_string())
            .part("data", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.widget_url("images"))
            .header("Private-Token", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, Error::Upload))?;
        self.json_or_error(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_server_and_canvas() {
        assert!(matches!(
            HttpCanvasClient::new(Client::new(), "", "key", "c1").unwrap_err(),
            Error::Configuration(_)
        ));
        assert!(matches!(
            HttpCanvasClient::new(Client::new(), "https://canvus.local", "key", "").unwrap_err(),
            Error::Configuration(_)
        ));
    }

    #[test]
    fn widget_urls_are_canvas_scoped() {
        let client =
            HttpCanvasClient::new(Client::new(), "https://canvus.local/", "key", "c1").unwrap();
        assert_eq!(
            client.widget_url("notes"),
            "https://canvus.local/api/v1/canvases/c1/notes"
        );
        assert_eq!(
            client.widget_url("images"),
            "https://canvus.local/api/v1/canvases/c1/images"
        );
    }
}
