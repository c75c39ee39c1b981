mod client;
pub mod types;

use crate::error::Result;

use client::{OpenRouterClient, OPENROUTER_API_URL};
use types::{ChatRequest, ChatResponse};

// =============================================================================
// OpenRouter
// =============================================================================

/// OpenRouter connection settings. The model is chosen per request.
#[derive(Clone)]
pub struct OpenRouter {
    api_key: String,
    base_url: String,
    app_name: Option<String>,
    site_url: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for OpenRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouter")
            .field("base_url", &self.base_url)
            .field("app_name", &self.app_name)
            .field("site_url", &self.site_url)
            .finish_non_exhaustive()
    }
}

impl OpenRouter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENROUTER_API_URL.to_string(),
            app_name: None,
            site_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Override the API base (or full `/chat/completions` endpoint).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn with_site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn client(&self) -> OpenRouterClient<'_> {
        let mut client = OpenRouterClient::new(&self.api_key, &self.http, &self.base_url);
        if let Some(ref name) = self.app_name {
            client = client.with_app_name(name);
        }
        if let Some(ref url) = self.site_url {
            client = client.with_site_url(url);
        }
        client
    }

    /// Send one chat-completion request and return the reply as received.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.client().chat(request).await
    }
}
