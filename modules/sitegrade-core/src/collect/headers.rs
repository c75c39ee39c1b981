use async_trait::async_trait;
use tracing::debug;

use super::{http_client, HeaderSource};
use crate::error::{CollectError, CollectResult};
use crate::types::SecurityHeaders;

pub struct HttpHeaderInspector {
    http: reqwest::Client,
}

impl HttpHeaderInspector {
    pub fn new() -> CollectResult<Self> {
        Ok(Self {
            http: http_client()?,
        })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HeaderSource for HttpHeaderInspector {
    /// Headers are read whatever the response status is.
    async fn fetch_security_headers(&self, url: &str) -> CollectResult<SecurityHeaders> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CollectError::http(url, e))?;

        let headers = resp.headers();
        let collected = SecurityHeaders::from_lookup(resp.url().as_str(), |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        });

        debug!(
            url,
            status = resp.status().as_u16(),
            present = collected.present_count(),
            "Security headers collected"
        );
        Ok(collected)
    }

    fn name(&self) -> &str {
        "http"
    }
}
