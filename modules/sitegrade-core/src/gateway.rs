use ai_client::{ChatRequest, ChatResponse, OpenRouter, WireMessage};
use async_trait::async_trait;

use crate::config::AppConfig;

/// One single-turn judging request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    model: String,
    prompt: String,
    image_base64: Option<String>,
}

impl ModelRequest {
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            image_base64: None,
        }
    }

    pub fn with_image(
        model: impl Into<String>,
        prompt: impl Into<String>,
        image_base64: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            image_base64: Some(image_base64.into()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image_base64(&self) -> Option<&str> {
        self.image_base64.as_deref()
    }

    /// Wire form: one user message, text first, then the image if any.
    pub fn to_chat_request(&self) -> ChatRequest {
        let message = match self.image_base64 {
            Some(ref image) => WireMessage::user_with_image(&self.prompt, image),
            None => WireMessage::user(&self.prompt),
        };
        ChatRequest::new(&self.model).message(message)
    }
}

/// Sends a judging request to the external model and returns the raw reply.
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> ai_client::Result<ChatResponse>;

    fn name(&self) -> &str {
        "unknown"
    }
}

/// Gateway backed by an OpenRouter-compatible chat-completions endpoint.
pub struct OpenRouterGateway {
    client: OpenRouter,
}

impl OpenRouterGateway {
    pub fn new(client: OpenRouter) -> Self {
        Self { client }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut client = OpenRouter::new(&config.openrouter_api_key);
        if let Some(ref url) = config.openrouter_api_url {
            client = client.with_base_url(url);
        }
        if let Some(ref name) = config.openrouter_app_name {
            client = client.with_app_name(name);
        }
        if let Some(ref site) = config.openrouter_site_url {
            client = client.with_site_url(site);
        }
        Self::new(client)
    }
}

#[async_trait]
impl ModelGateway for OpenRouterGateway {
    async fn complete(&self, request: &ModelRequest) -> ai_client::Result<ChatResponse> {
        self.client.chat(&request.to_chat_request()).await
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}
