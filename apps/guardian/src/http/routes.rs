// [apps/guardian/src/http/routes.rs]
//! Assembles the full router (`spec.md` §6's endpoint table): public
//! routes, the protected API surface behind `auth_guard`, and static
//! asset serving.

use super::handlers::{adhoc, auth, diagnostics, health, tests};
use super::middleware::{auth_guard, security_headers};
use super::state::AppState;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

const DASHBOARD_HTML: &str = include_str!("../../static/index.html");

async fn dashboard() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

async fn login_page() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(dashboard))
        .route("/logout", post(auth::logout))
        .route("/api/tests/status", get(tests::status))
        .route("/api/tests/run-all", post(tests::run_all))
        .route("/api/tests/dns/resolve", post(adhoc::dns_resolve))
        .route("/api/tests/ssl/check", post(adhoc::ssl_check))
        .route("/api/tests/:probe_id", post(tests::run_one))
        .route("/api/diagnostics/collect", post(diagnostics::collect))
        .route("/api/diagnostics/status", get(diagnostics::status))
        .route("/api/diagnostics/download", get(diagnostics::download))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let public = Router::new()
        .route("/login", get(login_page).post(auth::login))
        .route("/token", post(auth::token))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .route("/version", get(health::version))
        .fallback(not_found);

    Router::new()
        .merge(protected)
        .merge(public)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, axum::Json(serde_json::json!({ "error": "not_found", "message": "no such route" })))
}

/// Renders a handler panic as the same 500 shape `GuardianError::Internal`
/// produces, instead of letting axum's default panic response (or a
/// severed connection) reach the client (`spec.md` §7).
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err.downcast_ref::<&str>().map(|s| s.to_string()).or_else(|| err.downcast_ref::<String>().cloned()).unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %detail, "handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": "internal_error", "message": "internal error" }))).into_response()
}
