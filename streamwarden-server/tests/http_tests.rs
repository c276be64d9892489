//! HTTP adapter integration tests — routing, status codes, shutdown lifecycle

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use streamwarden_engine::{AuditActor, DrainOutcome, EngineConfig, IngestService, ShutdownReason, UserRegistry};
use streamwarden_server::{http, RequestHandler, StreamHandler};

fn app(config: EngineConfig) -> (axum::Router, Arc<IngestService>) {
    let audit = AuditActor::spawn(64);
    let service = Arc::new(IngestService::new(
        config,
        Arc::new(UserRegistry::seeded()),
        Arc::new(audit.clone()),
    )
    .unwrap());
    let handler: Arc<dyn RequestHandler> = Arc::new(StreamHandler::new(service.clone(), audit).unwrap());
    (http::router(handler), service)
}

fn post(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_submit_then_limit() {
    let (router, service) = app(EngineConfig::new(2).with_capacity_grace(Duration::from_secs(60)));

    for expected in ["1/2", "2/2"] {
        let resp = router
            .clone()
            .oneshot(post(r#"{"streamId":"1","events":[{"type":"ssh","name":"guest","passwd":"T3mpPass!"}]}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["count"], expected);
    }

    let resp = router.clone().oneshot(post(r#"{"streamId":"3"}"#)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(resp).await["error"], "Maximum streams limit reached");

    service.drain().await;
    assert_eq!(service.stats().completed, 2);
}

#[tokio::test]
async fn test_method_and_body_errors() {
    let (router, _service) = app(EngineConfig::default());

    let resp = router
        .clone()
        .oneshot(Request::builder().method("PUT").uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(resp).await["error"], "Method not allowed");

    let resp = router.clone().oneshot(post("[1,2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Invalid JSON");

    let resp = router
        .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_stats() {
    let (router, _service) = app(EngineConfig::default());

    let resp = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let resp = router
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["ingest"]["max_streams"], 5);
    assert_eq!(body["audit"]["total"], 0);
}

#[tokio::test]
async fn test_rejects_after_shutdown() {
    let (router, service) = app(EngineConfig::default());
    service.signal().fire(ShutdownReason::Interrupted);

    let resp = router.oneshot(post(r#"{"streamId":"1","events":[]}"#)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(resp).await["error"], "Shutting down");
}

#[tokio::test]
async fn test_serve_stops_on_signal() {
    let (router, service) = app(EngineConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    let stop = service.signal().clone();
    let server = tokio::spawn(http::serve(listener, router, async move {
        stop.wait().await;
    }));

    service.signal().fire(ShutdownReason::Timeout);
    let result = tokio::time::timeout(Duration::from_secs(5), server).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn test_wind_down_within_bound() {
    let (router, service) = app(EngineConfig::default().with_drain_timeout(Duration::from_secs(5)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    let stop = service.signal().clone();
    let server = tokio::spawn(http::serve(listener, router, async move {
        stop.wait().await;
    }));

    service.signal().fire(ShutdownReason::Interrupted);
    assert_eq!(http::wind_down(&service, server).await, Some(DrainOutcome::Drained));
}

#[tokio::test]
async fn test_wind_down_shares_one_bound() {
    let (_router, service) = app(EngineConfig::default().with_drain_timeout(Duration::from_millis(50)));
    // A server that never finishes its open connections
    let server = tokio::spawn(std::future::pending::<std::io::Result<()>>());

    let started = std::time::Instant::now();
    assert_eq!(http::wind_down(&service, server).await, None);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[cfg(feature = "metrics")]
#[tokio::test]
async fn test_metrics_exposition() {
    let (router, _service) = app(EngineConfig::default());
    router.clone().oneshot(post("nope")).await.unwrap();

    let resp = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"outcome="invalid_json""#));
}
