pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

/// Captures are always JPEG; the stored files and data URIs assume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Jpeg,
}

/// Options forwarded to the headless browser's screenshot call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotOptions {
    pub full_page: bool,
    #[serde(rename = "type")]
    pub image_type: ImageType,
    /// JPEG quality, 1-100. Browserless picks its own default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

impl ScreenshotOptions {
    pub fn with_quality(mut self, quality: Option<u8>) -> Self {
        self.quality = quality;
        self
    }
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            full_page: true,
            image_type: ImageType::Jpeg,
            quality: None,
        }
    }
}

#[derive(Serialize)]
struct ScreenshotRequest<'a> {
    url: &'a str,
    options: &'a ScreenshotOptions,
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}/{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Render `url` in the headless browser and return the encoded image bytes.
    pub async fn screenshot(&self, url: &str, options: &ScreenshotOptions) -> Result<Vec<u8>> {
        let endpoint = self.endpoint("screenshot");
        debug!(url, full_page = options.full_page, "Browserless screenshot request");

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&ScreenshotRequest { url, options })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(BrowserlessError::EmptyImage(url.to_string()));
        }
        Ok(bytes.to_vec())
    }
}
