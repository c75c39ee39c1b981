//! Evaluation flows end to end with in-memory collectors and gateway.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ai_client::{AiError, ChatResponse};
use async_trait::async_trait;
use sitegrade_core::{
    CollectError, CollectResult, EvaluationError, EvaluationKind, EvaluationOutcome,
    EvaluationRequest, Evaluator, HeaderSource, MarkupSource, ModelGateway, ModelRequest,
    ModelSelection, PageRenderer, ScreenshotId, ScreenshotStore, SecurityHeaders,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeMarkup {
    calls: AtomicUsize,
}

#[async_trait]
impl MarkupSource for FakeMarkup {
    async fn fetch_cleaned_markup(&self, url: &str) -> CollectResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("down") {
            return Err(CollectError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(format!("<main><h1>{url}</h1></main>"))
    }
}

#[derive(Default)]
struct FakeHeaders {
    calls: AtomicUsize,
}

#[async_trait]
impl HeaderSource for FakeHeaders {
    async fn fetch_security_headers(&self, url: &str) -> CollectResult<SecurityHeaders> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SecurityHeaders::from_lookup(url, |name| {
            (name == "X-Frame-Options").then(|| "SAMEORIGIN".to_string())
        }))
    }
}

#[derive(Default)]
struct FakeRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn capture_full_page(&self, _url: &str) -> CollectResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0xFF, 0xD8, 0xFF])
    }
}

enum Scripted {
    Reply(&'static str),
    NoChoices,
    Fail,
}

struct FakeGateway {
    script: Scripted,
    requests: Mutex<Vec<ModelRequest>>,
}

impl FakeGateway {
    fn new(script: Scripted) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn complete(&self, request: &ModelRequest) -> ai_client::Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script {
            Scripted::Reply(text) => Ok(serde_json::from_value(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": text}}]
            }))
            .unwrap()),
            Scripted::NoChoices => Ok(ChatResponse::default()),
            Scripted::Fail => Err(AiError::Network("connection refused".into())),
        }
    }
}

struct Harness {
    evaluator: Evaluator,
    markup: Arc<FakeMarkup>,
    headers: Arc<FakeHeaders>,
    renderer: Arc<FakeRenderer>,
    gateway: Arc<FakeGateway>,
    _dir: tempfile::TempDir,
}

fn harness(script: Scripted) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let markup = Arc::new(FakeMarkup::default());
    let headers = Arc::new(FakeHeaders::default());
    let renderer = Arc::new(FakeRenderer::default());
    let gateway = Arc::new(FakeGateway::new(script));

    let evaluator = Evaluator::new(
        markup.clone(),
        headers.clone(),
        renderer.clone(),
        ScreenshotStore::new(dir.path()),
        gateway.clone(),
        ModelSelection {
            html: "text-model".into(),
            security: "security-model".into(),
            user_experience: "vision-model".into(),
        },
    );

    Harness {
        evaluator,
        markup,
        headers,
        renderer,
        gateway,
        _dir: dir,
    }
}

const GOOD_REPLY: &str =
    "- **Score**: 4.5/5\n- **Evaluation**: Well structured.\n- **Suggestions**: Add alt text.";

// ---------------------------------------------------------------------------
// HTML flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn html_flow_embeds_markup_and_returns_success() {
    let h = harness(Scripted::Reply(GOOD_REPLY));

    let outcome = h.evaluator.evaluate_html("https://example.com").await.unwrap();

    assert_eq!(
        outcome,
        EvaluationOutcome::Success {
            score: 4.5,
            evaluation: "Well structured.".into()
        }
    );
    assert_eq!(h.markup.calls.load(Ordering::SeqCst), 1);

    let requests = h.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model(), "text-model");
    assert!(requests[0]
        .prompt()
        .contains("<main><h1>https://example.com</h1></main>"));
    assert!(requests[0].image_base64().is_none());
}

#[tokio::test]
async fn blank_url_is_rejected_before_any_collection() {
    let h = harness(Scripted::Reply(GOOD_REPLY));

    for url in ["", "   ", "\n\t"] {
        assert!(matches!(
            h.evaluator.evaluate_html(url).await,
            Err(EvaluationError::MissingUrl)
        ));
        assert!(matches!(
            h.evaluator.evaluate_security(url).await,
            Err(EvaluationError::MissingUrl)
        ));
        assert!(matches!(
            h.evaluator
                .evaluate_user_experience(url, &ScreenshotId::new())
                .await,
            Err(EvaluationError::MissingUrl)
        ));
        assert!(matches!(
            h.evaluator.capture_screenshot(url).await,
            Err(EvaluationError::MissingUrl)
        ));
    }

    assert_eq!(h.markup.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.headers.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
    assert!(h.gateway.requests().is_empty());
}

#[tokio::test]
async fn collection_failure_stops_before_the_model() {
    let h = harness(Scripted::Reply(GOOD_REPLY));

    let err = h
        .evaluator
        .evaluate_html("https://down.example.com")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvaluationError::Collection(CollectError::Status { status: 503, .. })
    ));
    assert!(!err.is_input_error());
    assert!(h.gateway.requests().is_empty());
}

// ---------------------------------------------------------------------------
// Security flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn security_flow_sends_header_evidence_once() {
    let h = harness(Scripted::Reply("**Score**: 2/5\n**Evaluation**: Missing CSP."));

    let outcome = h
        .evaluator
        .evaluate(&EvaluationRequest::security("https://example.com"))
        .await
        .unwrap();

    assert_eq!(outcome.score(), Some(2.0));
    assert_eq!(h.headers.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.markup.calls.load(Ordering::SeqCst), 0);

    let requests = h.gateway.requests();
    assert_eq!(requests[0].model(), "security-model");
    assert!(requests[0].prompt().contains(r#""X-Frame-Options": "SAMEORIGIN""#));
    assert!(requests[0].prompt().contains(r#""Content-Security-Policy": null"#));
}

// ---------------------------------------------------------------------------
// UX flow and screenshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn capture_then_evaluate_sends_the_captured_image() {
    let h = harness(Scripted::Reply(
        "<think>Looking at contrast...</think>\n**Score**: 3/5\n**Evaluation**: ok",
    ));

    let id = h
        .evaluator
        .capture_screenshot("https://example.com")
        .await
        .unwrap();
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 1);

    let outcome = h
        .evaluator
        .evaluate(&EvaluationRequest::user_experience("https://example.com", id))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        EvaluationOutcome::Success {
            score: 3.0,
            evaluation: "ok".into()
        }
    );
    // Evaluation reuses the capture instead of rendering again.
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 1);

    let requests = h.gateway.requests();
    assert_eq!(requests[0].model(), "vision-model");
    assert_eq!(requests[0].image_base64(), Some("/9j/"));
}

#[tokio::test]
async fn ux_without_screenshot_is_input_error() {
    let h = harness(Scripted::Reply(GOOD_REPLY));
    let request = EvaluationRequest {
        url: "https://example.com".into(),
        kind: EvaluationKind::UserExperience,
        screenshot: None,
    };

    let err = h.evaluator.evaluate(&request).await.unwrap_err();
    assert!(matches!(err, EvaluationError::MissingScreenshot));
    assert!(err.is_input_error());
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ux_with_unknown_screenshot_is_not_found() {
    let h = harness(Scripted::Reply(GOOD_REPLY));
    let missing = ScreenshotId::new();

    let err = h
        .evaluator
        .evaluate_user_experience("https://example.com", &missing)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvaluationError::Collection(CollectError::ScreenshotNotFound(id)) if id == missing
    ));
    assert!(h.gateway.requests().is_empty());
}

// ---------------------------------------------------------------------------
// Upstream and extraction failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_choices_is_upstream_failure() {
    let h = harness(Scripted::NoChoices);

    let outcome = h.evaluator.evaluate_html("https://example.com").await.unwrap();
    assert_eq!(outcome, EvaluationOutcome::upstream("Unable to analyze the HTML."));
}

#[tokio::test]
async fn gateway_error_is_upstream_failure_after_one_attempt() {
    let h = harness(Scripted::Fail);

    let outcome = h
        .evaluator
        .evaluate_security("https://example.com")
        .await
        .unwrap();

    match outcome {
        EvaluationOutcome::UpstreamFailure { message } => {
            assert!(message.contains("connection refused"), "{message}")
        }
        other => panic!("expected upstream failure, got {other:?}"),
    }
    assert_eq!(h.gateway.requests().len(), 1);
}

#[tokio::test]
async fn off_template_reply_is_extraction_failure() {
    let h = harness(Scripted::Reply("This page looks great overall, 9 out of 10."));

    let outcome = h.evaluator.evaluate_html("https://example.com").await.unwrap();
    assert!(matches!(outcome, EvaluationOutcome::ExtractionFailure { .. }));
    assert!(!outcome.is_success());
}

// ---------------------------------------------------------------------------
// Combined report
// ---------------------------------------------------------------------------

#[tokio::test]
async fn evaluate_all_runs_each_flow_once() {
    let h = harness(Scripted::Reply(GOOD_REPLY));
    let id = h
        .evaluator
        .capture_screenshot("https://example.com")
        .await
        .unwrap();

    let report = h
        .evaluator
        .evaluate_all("https://example.com", Some(&id))
        .await
        .unwrap();

    assert!(report.html.as_ref().unwrap().is_success());
    assert!(report.security.as_ref().unwrap().is_success());
    assert!(report
        .user_experience
        .as_ref()
        .unwrap()
        .as_ref()
        .unwrap()
        .is_success());
    assert_eq!(h.markup.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.headers.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.gateway.requests().len(), 3);
}

#[tokio::test]
async fn evaluate_all_reports_partial_failures() {
    let h = harness(Scripted::Reply(GOOD_REPLY));

    let report = h
        .evaluator
        .evaluate_all("https://down.example.com", None)
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["url"], "https://down.example.com");
    assert!(json["html"]["error"]
        .as_str()
        .unwrap()
        .contains("status 503"));
    assert_eq!(json["security"]["score"], 4.5);
    assert!(json.get("user_experience").is_none());
}
