// [apps/guardian/src/http/handlers/auth.rs]
//! Login, token issuance, and logout (`spec.md` §4.6/§6).

use crate::auth::{issue_token, verify_credentials};
use crate::error::GuardianError;
use crate::http::state::AppState;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn check_rate_limit(state: &AppState, addr: SocketAddr) -> Result<(), GuardianError> {
    if state.rate_limiter.check_and_record(addr.ip()) {
        Ok(())
    } else {
        Err(GuardianError::RateLimited)
    }
}

/// `POST /login`: form login, sets an HTTP-only session cookie.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, GuardianError> {
    check_rate_limit(&state, addr)?;

    if !verify_credentials(&state.config.auth, &body.username, &body.password) {
        return Err(GuardianError::Auth);
    }

    let (token, expires_in) = issue_token(&state.config.auth).map_err(|_| GuardianError::Internal)?;
    let cookie = format!("session={token}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={expires_in}");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "access_token": token, "token_type": "bearer", "expires_in": expires_in })),
    )
        .into_response())
}

/// `POST /token`: alternate form login, returns the token in JSON only
/// (no cookie) — for API clients that manage the header themselves.
pub async fn token(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, GuardianError> {
    check_rate_limit(&state, addr)?;

    if !verify_credentials(&state.config.auth, &body.username, &body.password) {
        return Err(GuardianError::Auth);
    }

    let (access_token, expires_in) = issue_token(&state.config.auth).map_err(|_| GuardianError::Internal)?;
    Ok(Json(json!({ "access_token": access_token, "token_type": "bearer", "expires_in": expires_in })))
}

/// `POST /logout`: clears the session cookie. There is no server-side
/// session table to invalidate — the token remains cryptographically
/// valid until it expires, matching `spec.md` §4.6's "no revocation list".
pub async fn logout() -> Response {
    let cookie = "session=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0";
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response()
}
