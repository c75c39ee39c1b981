use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;

use sitegrade_core::{
    EvaluationError, EvaluationOutcome, EvaluationRequest, EvaluationResult, ScreenshotId,
};

use crate::AppState;

// --- Request body ---

/// Shared body of every evaluation route. Missing fields are reported by the
/// evaluator, not by deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EvaluateBody {
    url: Option<String>,
    screenshot_id: Option<String>,
}

impl EvaluateBody {
    fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    /// Parse the optional handle. A blank URL is reported first, matching
    /// the order the evaluator checks its inputs in.
    fn screenshot(&self) -> EvaluationResult<Option<ScreenshotId>> {
        if self.url().trim().is_empty() {
            return Err(EvaluationError::MissingUrl);
        }
        match self.screenshot_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(ScreenshotId::from_str(raw)?)),
        }
    }
}

// --- Helpers ---

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

fn error_response(route: &str, err: &EvaluationError) -> Response {
    if err.is_input_error() {
        return bad_request(err.to_string());
    }
    warn!(route, error = %err, "Evaluation failed before reaching the model");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

/// Success and extraction failures are 200 with a JSON body; upstream
/// failures are a 500 with the bare message.
fn outcome_response(route: &str, result: EvaluationResult<EvaluationOutcome>) -> Response {
    match result {
        Ok(EvaluationOutcome::UpstreamFailure { message }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
        }
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(route, &e),
    }
}

fn parse_body(body: Result<Json<EvaluateBody>, JsonRejection>) -> Result<EvaluateBody, Response> {
    body.map(|Json(body)| body)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

// --- Handlers ---

pub async fn evaluate_html(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EvaluateBody>, JsonRejection>,
) -> Response {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let request = EvaluationRequest::html(body.url());
    outcome_response("evaluate_html", state.evaluator.evaluate(&request).await)
}

pub async fn evaluate_security(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EvaluateBody>, JsonRejection>,
) -> Response {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let request = EvaluationRequest::security(body.url());
    outcome_response("evaluate_security", state.evaluator.evaluate(&request).await)
}

pub async fn take_screenshot(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EvaluateBody>, JsonRejection>,
) -> Response {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match state.evaluator.capture_screenshot(body.url()).await {
        Ok(id) => Json(serde_json::json!({
            "status": "success",
            "message": "Screenshot taken successfully",
            "screenshot_id": id,
        }))
        .into_response(),
        Err(e) => error_response("take_screenshot", &e),
    }
}

pub async fn evaluate_user_experience(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EvaluateBody>, JsonRejection>,
) -> Response {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let result = match body.screenshot() {
        Ok(screenshot) => {
            let request = EvaluationRequest {
                url: body.url().to_string(),
                kind: sitegrade_core::EvaluationKind::UserExperience,
                screenshot,
            };
            state.evaluator.evaluate(&request).await
        }
        Err(e) => Err(e),
    };
    outcome_response("evaluate_user_experience", result)
}

pub async fn evaluate_all(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EvaluateBody>, JsonRejection>,
) -> Response {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let screenshot = match body.screenshot() {
        Ok(screenshot) => screenshot,
        Err(e) => return error_response("evaluate", &e),
    };

    match state
        .evaluator
        .evaluate_all(body.url(), screenshot.as_ref())
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response("evaluate", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_screenshot_id_counts_as_absent() {
        let body = EvaluateBody {
            url: Some("https://example.com".into()),
            screenshot_id: Some("  ".into()),
        };
        assert_eq!(body.screenshot().unwrap(), None);
        assert_eq!(EvaluateBody::default().url(), "");
    }

    #[test]
    fn malformed_screenshot_id_is_input_error() {
        let body = EvaluateBody {
            url: Some("https://example.com".into()),
            screenshot_id: Some("../../etc/passwd".into()),
        };
        let err = body.screenshot().unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn blank_url_is_reported_before_screenshot_id() {
        let body = EvaluateBody {
            url: Some("  ".into()),
            screenshot_id: Some("not-a-uuid".into()),
        };
        assert!(matches!(body.screenshot(), Err(EvaluationError::MissingUrl)));
    }
}
