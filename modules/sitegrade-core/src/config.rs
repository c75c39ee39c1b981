use std::path::PathBuf;

use anyhow::{anyhow, Result};
use url::Url;

use crate::types::EvaluationKind;

/// Free-tier text model used for the markup and header evaluations.
pub const DEFAULT_TEXT_MODEL: &str = "deepseek/deepseek-chat:free";
/// Free-tier vision model used for the screenshot evaluation.
pub const DEFAULT_VISION_MODEL: &str = "google/gemini-2.0-flash-lite-preview-02-05:free";

pub const DEFAULT_BROWSERLESS_URL: &str = "http://localhost:3000";
pub const DEFAULT_SCREENSHOT_DIR: &str = "./screenshots";
/// Captures kept on disk before the oldest are evicted.
pub const DEFAULT_SCREENSHOT_RETENTION: usize = 20;

/// Model identifier per evaluation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub html: String,
    pub security: String,
    pub user_experience: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            html: DEFAULT_TEXT_MODEL.to_string(),
            security: DEFAULT_TEXT_MODEL.to_string(),
            user_experience: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

impl ModelSelection {
    pub fn for_kind(&self, kind: EvaluationKind) -> &str {
        match kind {
            EvaluationKind::Html => &self.html,
            EvaluationKind::Security => &self.security,
            EvaluationKind::UserExperience => &self.user_experience,
        }
    }
}

/// Application configuration loaded once at startup from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Model gateway
    pub openrouter_api_key: String,
    pub openrouter_api_url: Option<String>,
    pub openrouter_app_name: Option<String>,
    pub openrouter_site_url: Option<String>,
    pub models: ModelSelection,

    // Page renderer (Browserless)
    pub browserless_url: String,
    pub browserless_token: Option<String>,
    pub screenshot_dir: PathBuf,
    pub screenshot_quality: Option<u8>,
    pub screenshot_retention: usize,

    // HTTP front door
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = ModelSelection::default();
        let port = match var("API_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow!("API_PORT must be a port number, got {raw:?}"))?,
            None => 5000,
        };
        let screenshot_quality = match var("SCREENSHOT_QUALITY") {
            Some(raw) => match raw.parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => Some(q),
                _ => return Err(anyhow!("SCREENSHOT_QUALITY must be 1-100, got {raw:?}")),
            },
            None => None,
        };
        let screenshot_retention = match var("SCREENSHOT_RETENTION") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(anyhow!("SCREENSHOT_RETENTION must be a positive count, got {raw:?}")),
            },
            None => DEFAULT_SCREENSHOT_RETENTION,
        };
        let openrouter_api_url = var("OPENROUTER_API_URL")
            .map(|raw| service_url("OPENROUTER_API_URL", raw))
            .transpose()?;
        let browserless_url = service_url(
            "BROWSERLESS_URL",
            var("BROWSERLESS_URL").unwrap_or_else(|| DEFAULT_BROWSERLESS_URL.to_string()),
        )?;

        Ok(Self {
            openrouter_api_key: var("OPENROUTER_API_KEY")
                .ok_or_else(|| anyhow!("OPENROUTER_API_KEY must be set"))?,
            openrouter_api_url,
            openrouter_app_name: var("OPENROUTER_APP_NAME"),
            openrouter_site_url: var("OPENROUTER_SITE_URL"),
            models: ModelSelection {
                html: var("HTML_MODEL").unwrap_or(defaults.html),
                security: var("SECURITY_MODEL").unwrap_or(defaults.security),
                user_experience: var("UX_MODEL").unwrap_or(defaults.user_experience),
            },
            browserless_url,
            browserless_token: var("BROWSERLESS_TOKEN"),
            screenshot_dir: var("SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREENSHOT_DIR)),
            screenshot_quality,
            screenshot_retention,
            host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", ai_client::truncate_to_char_boundary(val, n), val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENROUTER_API_KEY: {}", preview(&self.openrouter_api_key));
        tracing::info!(
            "  OPENROUTER_API_URL: {}",
            self.openrouter_api_url.as_deref().unwrap_or("<default>")
        );
        tracing::info!("  BROWSERLESS_URL: {}", self.browserless_url);
        tracing::info!("  BROWSERLESS_TOKEN: {}", preview_opt(&self.browserless_token));
        tracing::info!(
            "  SCREENSHOT_DIR: {} (keeping {} captures)",
            self.screenshot_dir.display(),
            self.screenshot_retention
        );
        tracing::info!(
            html = %self.models.html,
            security = %self.models.security,
            ux = %self.models.user_experience,
            "  models"
        );
    }
}

/// Base URLs of the services we call must be absolute http(s) URLs.
fn service_url(key: &str, raw: String) -> Result<String> {
    let parsed = Url::parse(&raw).map_err(|e| anyhow!("{key} is not a valid URL ({e}): {raw:?}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("{key} must use http or https, got {raw:?}"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
