pub mod rest;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use sitegrade_core::Evaluator;

pub struct AppState {
    pub evaluator: Evaluator,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Evaluations
        .route("/evaluate_html", post(rest::evaluate_html))
        .route("/evaluate_security", post(rest::evaluate_security))
        .route("/take_screenshot", post(rest::take_screenshot))
        .route(
            "/evaluate_user_experience",
            post(rest::evaluate_user_experience),
        )
        .route("/evaluate", post(rest::evaluate_all))
        .with_state(state)
        // CORS: callers are browser front-ends on any origin
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Request span carries method + path; the evaluator logs the target URL itself
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
