//! The evaluation flows: collect evidence, compose, ask the model, extract.
//!
//! Each flow is strictly sequential and makes exactly one attempt at every
//! stage. Input is validated before any network or disk access.

use std::sync::Arc;

use anyhow::Result;
use browserless_client::{BrowserlessClient, ScreenshotOptions};
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::collect::{
    BrowserlessRenderer, HeaderSource, HttpHeaderInspector, HttpMarkupFetcher, MarkupSource,
    PageRenderer, ScreenshotStore,
};
use crate::config::{AppConfig, ModelSelection};
use crate::error::{EvaluationError, EvaluationResult};
use crate::extract::extract_reply;
use crate::gateway::{ModelGateway, ModelRequest, OpenRouterGateway};
use crate::prompt::compose;
use crate::types::{EvaluationKind, EvaluationOutcome, EvaluationRequest, Evidence, ScreenshotId};

/// Longest slice of a model reply written to debug logs.
const REPLY_LOG_PREVIEW: usize = 500;

#[derive(Clone)]
pub struct Evaluator {
    markup: Arc<dyn MarkupSource>,
    headers: Arc<dyn HeaderSource>,
    renderer: Arc<dyn PageRenderer>,
    screenshots: ScreenshotStore,
    gateway: Arc<dyn ModelGateway>,
    models: ModelSelection,
}

impl Evaluator {
    pub fn new(
        markup: Arc<dyn MarkupSource>,
        headers: Arc<dyn HeaderSource>,
        renderer: Arc<dyn PageRenderer>,
        screenshots: ScreenshotStore,
        gateway: Arc<dyn ModelGateway>,
        models: ModelSelection,
    ) -> Self {
        Self {
            markup,
            headers,
            renderer,
            screenshots,
            gateway,
            models,
        }
    }

    /// Wire up the production collectors and gateway.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let browserless = BrowserlessClient::new(
            &config.browserless_url,
            config.browserless_token.as_deref(),
        )?;

        Ok(Self::new(
            Arc::new(HttpMarkupFetcher::new()?),
            Arc::new(HttpHeaderInspector::new()?),
            Arc::new(BrowserlessRenderer::new(browserless).with_options(
                ScreenshotOptions::default().with_quality(config.screenshot_quality),
            )),
            ScreenshotStore::new(&config.screenshot_dir).with_retention(config.screenshot_retention),
            Arc::new(OpenRouterGateway::from_config(config)),
            config.models.clone(),
        ))
    }

    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    pub fn screenshots(&self) -> &ScreenshotStore {
        &self.screenshots
    }

    /// Dispatch on the request's kind.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResult<EvaluationOutcome> {
        match request.kind {
            EvaluationKind::Html => self.evaluate_html(&request.url).await,
            EvaluationKind::Security => self.evaluate_security(&request.url).await,
            EvaluationKind::UserExperience => {
                require_url(&request.url)?;
                let screenshot = request.screenshot.ok_or(EvaluationError::MissingScreenshot)?;
                self.evaluate_user_experience(&request.url, &screenshot).await
            }
        }
    }

    pub async fn evaluate_html(&self, url: &str) -> EvaluationResult<EvaluationOutcome> {
        let url = require_url(url)?;
        info!(kind = %EvaluationKind::Html, url, "Evaluation started");

        let markup = self.markup.fetch_cleaned_markup(url).await?;
        Ok(self.judge(&Evidence::Markup(markup)).await)
    }

    pub async fn evaluate_security(&self, url: &str) -> EvaluationResult<EvaluationOutcome> {
        let url = require_url(url)?;
        info!(kind = %EvaluationKind::Security, url, "Evaluation started");

        let headers = self.headers.fetch_security_headers(url).await?;
        Ok(self.judge(&Evidence::SecurityHeaders(headers)).await)
    }

    /// Judge a screenshot captured earlier by [`Self::capture_screenshot`].
    /// Never triggers a capture itself.
    pub async fn evaluate_user_experience(
        &self,
        url: &str,
        screenshot: &ScreenshotId,
    ) -> EvaluationResult<EvaluationOutcome> {
        let url = require_url(url)?;
        info!(kind = %EvaluationKind::UserExperience, url, screenshot_id = %screenshot, "Evaluation started");

        let base64 = self.screenshots.load_base64(screenshot).await?;
        let evidence = Evidence::Screenshot {
            url: url.to_string(),
            id: *screenshot,
            base64,
        };
        Ok(self.judge(&evidence).await)
    }

    /// Render `url` and store the image. The returned id is what a later UX
    /// evaluation must present.
    pub async fn capture_screenshot(&self, url: &str) -> EvaluationResult<ScreenshotId> {
        let url = require_url(url)?;
        info!(url, renderer = self.renderer.name(), "Capturing screenshot");

        let image = self.renderer.capture_full_page(url).await?;
        Ok(self.screenshots.save(&image).await?)
    }

    /// Run the HTML and security flows, plus UX when a screenshot is given,
    /// as independent concurrent pipelines.
    pub async fn evaluate_all(
        &self,
        url: &str,
        screenshot: Option<&ScreenshotId>,
    ) -> EvaluationResult<Report> {
        let url = require_url(url)?;

        let ux = async {
            match screenshot {
                Some(id) => Some(self.evaluate_user_experience(url, id).await),
                None => None,
            }
        };
        let (html, security, user_experience) =
            futures::join!(self.evaluate_html(url), self.evaluate_security(url), ux);

        Ok(Report {
            url: url.to_string(),
            html,
            security,
            user_experience,
        })
    }

    async fn judge(&self, evidence: &Evidence) -> EvaluationOutcome {
        let kind = evidence.kind();
        let model = self.models.for_kind(kind);
        let prompt = compose(evidence);

        let request = match evidence.image_base64() {
            Some(image) => ModelRequest::with_image(model, prompt, image),
            None => ModelRequest::text(model, prompt),
        };

        debug!(
            kind = %kind,
            model,
            gateway = self.gateway.name(),
            prompt_chars = request.prompt().len(),
            with_image = request.image_base64().is_some(),
            "Querying model"
        );

        let reply = match self.gateway.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(kind = %kind, model, error = %e, "Model gateway failed");
                return EvaluationOutcome::upstream(format!("An error occurred: {e}"));
            }
        };

        if let Some(text) = reply.first_content() {
            debug!(
                kind = %kind,
                reply = ai_client::truncate_to_char_boundary(text, REPLY_LOG_PREVIEW),
                "Model replied"
            );
        }

        let outcome = extract_reply(kind, &reply);
        match &outcome {
            EvaluationOutcome::Success { score, .. } => {
                info!(kind = %kind, score, "Evaluation complete")
            }
            EvaluationOutcome::ExtractionFailure { .. } => {
                warn!(kind = %kind, model, "Model reply did not follow the template")
            }
            EvaluationOutcome::UpstreamFailure { message } => {
                warn!(kind = %kind, model, error = ?reply.error, "{message}")
            }
        }
        outcome
    }
}

fn require_url(url: &str) -> EvaluationResult<&str> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(EvaluationError::MissingUrl);
    }
    Ok(trimmed)
}

/// Results of [`Evaluator::evaluate_all`]. Each entry serializes as the
/// outcome itself, or `{"error": ...}` when the flow stopped early.
#[derive(Debug, Serialize)]
pub struct Report {
    pub url: String,
    #[serde(serialize_with = "serialize_entry")]
    pub html: EvaluationResult<EvaluationOutcome>,
    #[serde(serialize_with = "serialize_entry")]
    pub security: EvaluationResult<EvaluationOutcome>,
    #[serde(
        serialize_with = "serialize_optional_entry",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_experience: Option<EvaluationResult<EvaluationOutcome>>,
}

fn serialize_entry<S: Serializer>(
    entry: &EvaluationResult<EvaluationOutcome>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match entry {
        Ok(outcome) => outcome.serialize(serializer),
        Err(e) => serde_json::json!({ "error": e.to_string() }).serialize(serializer),
    }
}

fn serialize_optional_entry<S: Serializer>(
    entry: &Option<EvaluationResult<EvaluationOutcome>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match entry {
        Some(entry) => serialize_entry(entry, serializer),
        None => serializer.serialize_none(),
    }
}
