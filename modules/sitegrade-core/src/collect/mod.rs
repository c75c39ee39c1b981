//! Evidence collectors: cleaned markup, security headers, and screenshots.

mod headers;
mod markup;
mod screenshot;

pub use headers::HttpHeaderInspector;
pub use markup::{clean_markup, HttpMarkupFetcher};
pub use screenshot::{BrowserlessRenderer, ScreenshotStore};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CollectError, CollectResult};
use crate::types::SecurityHeaders;

/// Client-side timeout for requests to the evaluated site.
pub(crate) const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> CollectResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("sitegrade/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CollectError::http("<client>", e))
}

/// Fetches a page and returns its markup with scripts and styling removed.
#[async_trait]
pub trait MarkupSource: Send + Sync {
    async fn fetch_cleaned_markup(&self, url: &str) -> CollectResult<String>;

    fn name(&self) -> &str {
        "unknown"
    }
}

/// Performs one request and reads the allow-listed security headers.
#[async_trait]
pub trait HeaderSource: Send + Sync {
    async fn fetch_security_headers(&self, url: &str) -> CollectResult<SecurityHeaders>;

    fn name(&self) -> &str {
        "unknown"
    }
}

/// Renders a page in a headless browser and returns a full-page JPEG.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn capture_full_page(&self, url: &str) -> CollectResult<Vec<u8>>;

    fn name(&self) -> &str {
        "unknown"
    }
}
