//! Tika extraction adapter: uploads the file to a Tika-compatible server.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use tracing::debug;

use pdfq_core::defaults::TIKA_URL;
use pdfq_core::{Error, Result, TextExtractor};

/// Adapter for `PUT {base_url}/tika` text extraction.
///
/// The whole file is sent as the request body and the plain-text response
/// is returned as-is. A 422 means Tika could not parse the document and
/// becomes [`Error::InvalidDocument`]; other non-2xx responses become
/// [`Error::Extraction`].
pub struct TikaExtractor {
    client: Client,
    base_url: String,
}

impl Default for TikaExtractor {
    fn default() -> Self {
        Self::new(TIKA_URL)
    }
}

impl TikaExtractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextExtractor for TikaExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let body = tokio::fs::read(path).await.map_err(|e| {
            Error::InvalidDocument(format!("failed to read {}: {}", path.display(), e))
        })?;
        debug!(
            component = "tika",
            file_path = %path.display(),
            bytes = body.len(),
            "Uploading file to Tika"
        );

        let response = self
            .client
            .put(format!("{}/tika", self.base_url))
            .header(ACCEPT, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("Tika request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!(
                "Tika returned {} for {}: {}",
                status,
                path.display(),
                detail.trim()
            );
            return Err(if status == StatusCode::UNPROCESSABLE_ENTITY {
                Error::InvalidDocument(message)
            } else {
                Error::Extraction(message)
            });
        }

        response
            .text()
            .await
            .map_err(|e| Error::Extraction(format!("failed to read Tika response: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(format!("{}/version", self.base_url))
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "tika"
    }
}
