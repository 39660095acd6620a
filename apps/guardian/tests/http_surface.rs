// [apps/guardian/tests/http_surface.rs]
//! End-to-end-ish tests against the assembled router (`spec.md` §8): the
//! unauthenticated health surface, the login/rate-limit boundary, the
//! auth guard, and ad-hoc request validation. Drives the router directly
//! with `tower::ServiceExt::oneshot` rather than binding a real socket.

mod support;

use axum::body::{to_bytes, Body};
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use guardian::http::create_router;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower::ServiceExt;

fn client_addr(last_octet: u8) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, last_octet)), 0)
}

fn with_connect_info(mut req: Request<Body>, addr: SocketAddr) -> Request<Body> {
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("collect body");
    serde_json::from_slice(&bytes).expect("valid json body")
}

#[tokio::test]
async fn liveness_is_always_200_and_unauthenticated() {
    let app = create_router(support::test_state());
    let req = Request::builder().uri("/health/live").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readiness_is_200_once_config_is_loaded() {
    let app = create_router(support::test_state());
    let req = Request::builder().uri("/health/ready").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn version_endpoint_reports_the_configured_version() {
    let app = create_router(support::test_state());
    let req = Request::builder().uri("/version").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], "test");
}

#[tokio::test]
async fn protected_endpoint_without_a_token_is_401() {
    let app = create_router(support::test_state());
    let req = Request::builder().uri("/api/tests/status").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_probe_id_is_404() {
    let state = support::test_state();
    let app = create_router(state.clone());

    // Obtain a real token via /token first; the probe route sits behind auth_guard.
    let login_req = with_connect_info(
        Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "username": support::TEST_USERNAME, "password": support::TEST_PASSWORD }).to_string()))
            .unwrap(),
        client_addr(10),
    );
    let login_response = app.clone().oneshot(login_req).await.unwrap();
    assert_eq!(login_response.status(), StatusCode::OK);
    let token = body_json(login_response).await["access_token"].as_str().unwrap().to_string();

    let probe_req = Request::builder()
        .method("POST")
        .uri("/api/tests/does-not-exist")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(probe_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn eleventh_login_attempt_within_a_minute_is_rate_limited() {
    let state = support::test_state();
    let app = create_router(state);
    let addr = client_addr(20);

    let bad_login = || {
        with_connect_info(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "username": "admin", "password": "wrong" }).to_string()))
                .unwrap(),
            addr,
        )
    };

    for _ in 0..10 {
        let response = app.clone().oneshot(bad_login()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let eleventh = app.clone().oneshot(bad_login()).await.unwrap();
    assert_eq!(eleventh.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn empty_password_is_rejected_like_any_other_wrong_password() {
    let state = support::test_state();
    let app = create_router(state);
    let req = with_connect_info(
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "username": support::TEST_USERNAME, "password": "" }).to_string()))
            .unwrap(),
        client_addr(30),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn correct_credentials_issue_a_usable_token() {
    let state = support::test_state();
    let app = create_router(state);
    let req = with_connect_info(
        Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "username": support::TEST_USERNAME, "password": support::TEST_PASSWORD }).to_string()))
            .unwrap(),
        client_addr(40),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn adhoc_dns_resolve_rejects_malformed_hostnames() {
    let state = support::test_state();
    let app = create_router(state);
    let login_req = with_connect_info(
        Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "username": support::TEST_USERNAME, "password": support::TEST_PASSWORD }).to_string()))
            .unwrap(),
        client_addr(50),
    );
    let login_response = app.clone().oneshot(login_req).await.unwrap();
    let token = body_json(login_response).await["access_token"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/api/tests/dns/resolve")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "hostname": "x!.com" }).to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn adhoc_ssl_check_rejects_out_of_range_ports() {
    let state = support::test_state();
    let app = create_router(state);
    let login_req = with_connect_info(
        Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "username": support::TEST_USERNAME, "password": support::TEST_PASSWORD }).to_string()))
            .unwrap(),
        client_addr(60),
    );
    let login_response = app.clone().oneshot(login_req).await.unwrap();
    let token = body_json(login_response).await["access_token"].as_str().unwrap().to_string();

    for port in [0, 65536] {
        let req = Request::builder()
            .method("POST")
            .uri("/api/tests/ssl/check")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "hostname": "example.com", "port": port }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "port {port} should be rejected");
    }
}

#[tokio::test]
async fn diagnostics_collect_requires_a_valid_namespace() {
    let state = support::test_state();
    let app = create_router(state);
    let login_req = with_connect_info(
        Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "username": support::TEST_USERNAME, "password": support::TEST_PASSWORD }).to_string()))
            .unwrap(),
        client_addr(70),
    );
    let login_response = app.clone().oneshot(login_req).await.unwrap();
    let token = body_json(login_response).await["access_token"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/api/diagnostics/collect")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "namespace": "Not_Valid!" }).to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn diagnostics_download_before_any_collection_is_404() {
    let state = support::test_state();
    let app = create_router(state);
    let login_req = with_connect_info(
        Request::builder()
            .method("POST")
            .uri("/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "username": support::TEST_USERNAME, "password": support::TEST_PASSWORD }).to_string()))
            .unwrap(),
        client_addr(80),
    );
    let login_response = app.clone().oneshot(login_req).await.unwrap();
    let token = body_json(login_response).await["access_token"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("GET")
        .uri("/api/diagnostics/download")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn security_headers_are_present_on_every_response() {
    let app = create_router(support::test_state());
    let req = Request::builder().uri("/health/live").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}
