//! Where word sheets come from: a published spreadsheet URL or a local file.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GameError, GameResult};

/// Fetches the raw text of a word sheet
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Return the text behind `locator`, or `SourceUnavailable` with the cause
    async fn fetch_text(&self, locator: &str) -> GameResult<String>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Downloads sheets over HTTP(S), e.g. a Google Sheets "publish to CSV" link
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self { client }
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn fetch_text(&self, locator: &str) -> GameResult<String> {
        let unavailable = |e: String| {
            GameError::SourceUnavailable(format!("Failed to load CSV from URL: {}", e))
        };

        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP status {}", response.status())));
        }

        response.text().await.map_err(|e| unavailable(e.to_string()))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Reads sheets from the local filesystem
#[derive(Default)]
pub struct FileSource;

#[async_trait]
impl ContentSource for FileSource {
    async fn fetch_text(&self, locator: &str) -> GameResult<String> {
        tokio::fs::read_to_string(locator).await.map_err(|e| {
            GameError::SourceUnavailable(format!("Failed to load CSV file: {}", e))
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Where a word-list reload should read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordSource {
    Url(String),
    File(PathBuf),
    /// CSV text supplied directly by the caller
    Inline(String),
    /// The configured sample sheet
    Sample,
}

impl WordSource {
    /// Pick a source from request fields: URL wins over file, file over
    /// inline text. Blank values count as absent.
    pub fn from_request(
        csv_url: Option<String>,
        csv_file: Option<String>,
        csv_text: Option<String>,
    ) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(url) = present(csv_url) {
            WordSource::Url(url.trim().to_string())
        } else if let Some(path) = present(csv_file) {
            WordSource::File(PathBuf::from(path.trim()))
        } else if let Some(text) = present(csv_text) {
            WordSource::Inline(text)
        } else {
            WordSource::Sample
        }
    }
}
