use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ai_client::{AiError, ChatResponse};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use sitegrade_api::{build_router, AppState};
use sitegrade_core::{
    CollectResult, Evaluator, HeaderSource, MarkupSource, ModelGateway, ModelRequest,
    ModelSelection, PageRenderer, ScreenshotStore, SecurityHeaders,
};

// --- Fakes ---

#[derive(Default)]
struct StaticSite {
    fetches: AtomicUsize,
}

#[async_trait]
impl MarkupSource for StaticSite {
    async fn fetch_cleaned_markup(&self, _url: &str) -> CollectResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok("<html><body><h1>Hi</h1></body></html>".into())
    }
}

#[async_trait]
impl HeaderSource for StaticSite {
    async fn fetch_security_headers(&self, url: &str) -> CollectResult<SecurityHeaders> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(SecurityHeaders::from_lookup(url, |_| None))
    }
}

#[async_trait]
impl PageRenderer for StaticSite {
    async fn capture_full_page(&self, _url: &str) -> CollectResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(b"jpeg".to_vec())
    }
}

struct CannedModel(Option<&'static str>);

#[async_trait]
impl ModelGateway for CannedModel {
    async fn complete(&self, _request: &ModelRequest) -> ai_client::Result<ChatResponse> {
        match self.0 {
            Some(text) => Ok(serde_json::from_value(serde_json::json!({
                "choices": [{"message": {"content": text}}]
            }))
            .unwrap()),
            None => Err(AiError::Api {
                status: 502,
                message: "provider down".into(),
            }),
        }
    }
}

struct TestApp {
    router: Router,
    site: Arc<StaticSite>,
    _dir: tempfile::TempDir,
}

fn app(reply: Option<&'static str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let site = Arc::new(StaticSite::default());
    let evaluator = Evaluator::new(
        site.clone(),
        site.clone(),
        site.clone(),
        ScreenshotStore::new(dir.path()),
        Arc::new(CannedModel(reply)),
        ModelSelection::default(),
    );
    TestApp {
        router: build_router(Arc::new(AppState { evaluator })),
        site,
        _dir: dir,
    }
}

async fn post(router: &Router, path: &str, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

const REPLY: &str = "**Score**: 4/5\n**Evaluation**: Clean markup.\n**Suggestions**: None.";

// --- Tests ---

#[tokio::test]
async fn health_check_is_ok_and_not_cached() {
    let t = app(Some(REPLY));
    let response = t
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn html_success_returns_score_and_evaluation() {
    let t = app(Some(REPLY));
    let (status, body) = post(
        &t.router,
        "/evaluate_html",
        serde_json::json!({"url": "https://example.com"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body),
        serde_json::json!({"score": 4.0, "evaluation": "Clean markup."})
    );
}

#[tokio::test]
async fn missing_url_is_400_without_collection() {
    let t = app(Some(REPLY));
    for path in [
        "/evaluate_html",
        "/evaluate_security",
        "/take_screenshot",
        "/evaluate_user_experience",
        "/evaluate",
    ] {
        let (status, body) = post(&t.router, path, serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(json(&body)["error"], "URL is required", "{path}");
    }
    assert_eq!(t.site.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_url_wins_over_malformed_screenshot_id() {
    let t = app(Some(REPLY));
    for path in ["/evaluate_user_experience", "/evaluate"] {
        let (status, body) = post(
            &t.router,
            path,
            serde_json::json!({"url": "  ", "screenshot_id": "not-a-uuid"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(
            json(&body),
            serde_json::json!({"error": "URL is required"}),
            "{path}"
        );
    }
    assert_eq!(t.site.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upstream_failure_is_plain_text_500() {
    let t = app(None);
    let (status, body) = post(
        &t.router,
        "/evaluate_security",
        serde_json::json!({"url": "https://example.com"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("An error occurred:"), "{text}");
    assert!(serde_json::from_str::<serde_json::Value>(&text).is_err());
}

#[tokio::test]
async fn extraction_failure_is_200_with_error() {
    let t = app(Some("I would rate this page highly."));
    let (status, body) = post(
        &t.router,
        "/evaluate_html",
        serde_json::json!({"url": "https://example.com"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body),
        serde_json::json!({"error": "Unable to extract score or evaluation from the response."})
    );
}

#[tokio::test]
async fn screenshot_then_user_experience() {
    let t = app(Some(REPLY));
    let (status, body) = post(
        &t.router,
        "/take_screenshot",
        serde_json::json!({"url": "https://example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Screenshot taken successfully");
    let id = body["screenshot_id"].as_str().unwrap().to_string();

    let (status, body) = post(
        &t.router,
        "/evaluate_user_experience",
        serde_json::json!({"url": "https://example.com", "screenshot_id": id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["score"], 4.0);
}

#[tokio::test]
async fn user_experience_requires_a_valid_known_screenshot() {
    let t = app(Some(REPLY));

    let (status, _) = post(
        &t.router,
        "/evaluate_user_experience",
        serde_json::json!({"url": "https://example.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &t.router,
        "/evaluate_user_experience",
        serde_json::json!({"url": "https://example.com", "screenshot_id": "not-a-uuid"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &t.router,
        "/evaluate_user_experience",
        serde_json::json!({
            "url": "https://example.com",
            "screenshot_id": "4f8c2b0e-3f41-4c3a-9d8e-2a7b5c6d1e0f"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json(&body)["error"]
        .as_str()
        .unwrap()
        .contains("screenshot not found"));
}

#[tokio::test]
async fn combined_report_includes_each_requested_kind() {
    let t = app(Some(REPLY));
    let (status, body) = post(
        &t.router,
        "/evaluate",
        serde_json::json!({"url": "https://example.com"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["url"], "https://example.com");
    assert_eq!(body["html"]["score"], 4.0);
    assert_eq!(body["security"]["evaluation"], "Clean markup.");
    assert!(body.get("user_experience").is_none());
}

#[tokio::test]
async fn malformed_json_is_400() {
    let t = app(Some(REPLY));
    let request = Request::builder()
        .method("POST")
        .uri("/evaluate_html")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = t.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
