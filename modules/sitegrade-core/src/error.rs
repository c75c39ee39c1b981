//! Typed errors for evidence collection and evaluation flows.
//!
//! Upstream and extraction failures are not errors here: they are
//! [`EvaluationOutcome`](crate::types::EvaluationOutcome) variants returned to
//! the caller.

use browserless_client::BrowserlessError;
use thiserror::Error;

use crate::types::ScreenshotId;

/// Errors raised while gathering evidence about a page.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Request to the target site failed before a response arrived
    #[error("error fetching {url}: {message}")]
    Http { url: String, message: String },

    /// Target site answered with a non-success status
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    /// Headless browser could not render the page
    #[error("render failed: {0}")]
    Render(#[from] BrowserlessError),

    /// No capture exists for this handle
    #[error("screenshot not found: {0}")]
    ScreenshotNotFound(ScreenshotId),

    /// Handle is not a screenshot identifier
    #[error("invalid screenshot id: {0}")]
    InvalidScreenshotId(String),

    #[error("screenshot storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectError {
    pub(crate) fn http(url: &str, err: reqwest::Error) -> Self {
        CollectError::Http {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors that stop an evaluation flow before the model is consulted.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("URL is required")]
    MissingUrl,

    #[error("screenshot_id is required; capture a screenshot first")]
    MissingScreenshot,

    #[error(transparent)]
    Collection(#[from] CollectError),
}

impl EvaluationError {
    /// Input errors are the caller's fault and are rejected before any I/O.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EvaluationError::MissingUrl
                | EvaluationError::MissingScreenshot
                | EvaluationError::Collection(CollectError::InvalidScreenshotId(_))
        )
    }
}

pub type CollectResult<T> = std::result::Result<T, CollectError>;

pub type EvaluationResult<T> = std::result::Result<T, EvaluationError>;
