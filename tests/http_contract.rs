//! HTTP contract of the admission middleware, exercised through an axum router.

mod common;

use admission_control::{
    AdmissionController, AdmissionLayer, ApiKeyExtractor, Policy, PolicyCatalog, RejectionBody,
};
use axum::body::{to_bytes, Body};
use axum::routing::{get, post};
use axum::Router;
use common::ManualClock;
use http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

const START_MS: u64 = 1_700_000_000_000;

fn request(method: &str, uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

fn header(response: &http::Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .map(|v| v.to_str().unwrap().to_string())
}

fn app(controller: &AdmissionController, catalog: &PolicyCatalog) -> Router {
    let bookings = AdmissionLayer::with_controller(
        controller.clone(),
        catalog.require("booking").unwrap().clone(),
    );
    let search = AdmissionLayer::with_controller(
        controller.clone(),
        catalog.require("search").unwrap().clone(),
    );

    Router::new()
        .route("/bookings", post(|| async { "created" }).layer(bookings))
        .route("/search", get(|| async { "[]" }).layer(search))
}

#[tokio::test]
async fn test_admitted_response_carries_quota_headers() {
    let clock = ManualClock::at(START_MS);
    let controller = AdmissionController::with_clock(Arc::new(clock.clone()));
    let app = app(&controller, &PolicyCatalog::marketplace().unwrap());

    let response = app
        .oneshot(request("POST", "/bookings", "203.0.113.7"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-limit").as_deref(), Some("10"));
    assert_eq!(header(&response, "x-ratelimit-remaining").as_deref(), Some("9"));
    assert_eq!(
        header(&response, "x-ratelimit-reset"),
        Some(((START_MS + 60_000) / 1000).to_string())
    );
    assert!(header(&response, "retry-after").is_none());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"created");
}

#[tokio::test]
async fn test_over_limit_gets_429_contract() {
    let clock = ManualClock::at(START_MS);
    let controller = AdmissionController::with_clock(Arc::new(clock.clone()));
    let app = app(&controller, &PolicyCatalog::marketplace().unwrap());

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(request("POST", "/bookings", "203.0.113.7"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    clock.advance(17_500);
    let response = app
        .clone()
        .oneshot(request("POST", "/bookings", "203.0.113.7"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        header(&response, "content-type").as_deref(),
        Some("application/json")
    );
    assert_eq!(header(&response, "x-ratelimit-limit").as_deref(), Some("10"));
    assert_eq!(header(&response, "x-ratelimit-remaining").as_deref(), Some("0"));
    assert_eq!(header(&response, "retry-after").as_deref(), Some("43"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"], "Too Many Requests");
    assert_eq!(
        json["message"],
        "Rate limit exceeded. Please try again in 43 seconds."
    );
    assert_eq!(json["retryAfter"], 43);

    let body: RejectionBody = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, RejectionBody::new(43));

    // Other routes keep their own quota for the same caller
    let response = app
        .oneshot(request("GET", "/search", "203.0.113.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining").as_deref(), Some("29"));
}

#[tokio::test]
async fn test_window_reset_readmits_caller() {
    let clock = ManualClock::at(START_MS);
    let controller = AdmissionController::with_clock(Arc::new(clock.clone()));
    let router = Router::new().route("/login", post(|| async { "ok" })).layer(
        AdmissionLayer::with_controller(
            controller.clone(),
            Policy::from_millis("auth", 1, 900_000).unwrap(),
        ),
    );

    let first = router
        .clone()
        .oneshot(request("POST", "/login", "198.51.100.9"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .clone()
        .oneshot(request("POST", "/login", "198.51.100.9"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&second, "retry-after").as_deref(), Some("900"));

    clock.advance(900_000);
    let third = router
        .oneshot(request("POST", "/login", "198.51.100.9"))
        .await
        .unwrap();
    assert_eq!(third.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_requests_without_client_headers_share_bucket() {
    let clock = ManualClock::at(START_MS);
    let router = Router::new().route("/track", post(|| async { "ok" })).layer(
        AdmissionLayer::builder()
            .with_policy(Policy::from_millis("tracking", 2, 60_000).unwrap())
            .with_clock(Arc::new(clock))
            .build()
            .unwrap(),
    );

    let anonymous = || {
        Request::builder()
            .method("POST")
            .uri("/track")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let response = router.clone().oneshot(anonymous()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = router.clone().oneshot(anonymous()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // An identified caller is not affected
    let response = router
        .oneshot(request("POST", "/track", "192.0.2.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_agency_traffic_counted_per_api_key() {
    let clock = ManualClock::at(START_MS);
    let controller = AdmissionController::with_clock(Arc::new(clock));
    let layer = AdmissionLayer::with_controller(
        controller.clone(),
        Policy::from_millis("agency", 1, 60_000).unwrap(),
    )
    .identity_extractor(Arc::new(ApiKeyExtractor::default()));
    let router = Router::new()
        .route("/agency/bookings", post(|| async { "ok" }))
        .layer(layer);

    let with_key = |key: &str| {
        Request::builder()
            .method("POST")
            .uri("/agency/bookings")
            .header("x-forwarded-for", "10.1.1.1")
            .header("x-api-key", key)
            .body(Body::empty())
            .unwrap()
    };

    let a = router.clone().oneshot(with_key("agency-1")).await.unwrap();
    let b = router.clone().oneshot(with_key("agency-2")).await.unwrap();
    let a_again = router.oneshot(with_key("agency-1")).await.unwrap();

    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);
    assert_eq!(a_again.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(controller.counter_count(), 2);
}
