// Transport-neutral request handling for the streamwarden ingest server
// The axum adapter in `http` is one binding; the handler itself knows nothing about sockets

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use streamwarden_engine::{AuditHandle, EngineError, IngestService, Stream};

pub mod http;
#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "metrics")]
pub use metrics::Metrics;

/// Default number of recent audit entries returned by `/stats?recent`
const DEFAULT_RECENT: usize = 20;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Maximum streams limit reached")]
    LimitReached,
    #[error("Shutting down")]
    ShuttingDown,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::NotFound => 404,
            ServerError::MethodNotAllowed => 405,
            ServerError::InvalidJson(_) => 400,
            ServerError::LimitReached => 429,
            ServerError::ShuttingDown => 503,
            ServerError::Internal(_) => 500,
        }
    }

    /// Message placed in the `error` field of the response body
    ///
    /// Parse details stay in the logs; clients only see the fixed text.
    pub fn public_message(&self) -> String {
        match self {
            ServerError::InvalidJson(_) => "Invalid JSON".to_string(),
            other => other.to_string(),
        }
    }

    /// Label used for request-outcome metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            ServerError::NotFound => "not_found",
            ServerError::MethodNotAllowed => "method_not_allowed",
            ServerError::InvalidJson(_) => "invalid_json",
            ServerError::LimitReached => "limit_reached",
            ServerError::ShuttingDown => "shutting_down",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CapacityExceeded { .. } => ServerError::LimitReached,
            EngineError::ShuttingDown => ServerError::ShuttingDown,
            EngineError::InvalidSubmission(msg) => ServerError::InvalidJson(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Internal(format!("Serialization failed: {}", err))
    }
}

/// Transport-neutral HTTP request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, String>,
}

impl IngestRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }
}

/// Transport-neutral HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl IngestResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status_code: 200,
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, ServerError> {
        Ok(Self::ok(serde_json::to_vec(value)?))
    }

    pub fn error(status_code: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string().into_bytes();
        Self {
            status_code,
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
        }
    }
}

impl From<ServerError> for IngestResponse {
    fn from(err: ServerError) -> Self {
        IngestResponse::error(err.status_code(), &err.public_message())
    }
}

/// Generic request handler trait
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_request(&self, req: IngestRequest) -> Result<IngestResponse, ServerError>;
}

/// Body of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAccepted {
    pub status: String,
    pub stream_id: String,
    pub count: String,
}

/// Streamwarden request handler backed by an [`IngestService`]
pub struct StreamHandler {
    service: Arc<IngestService>,
    audit: AuditHandle,
    #[cfg(feature = "metrics")]
    metrics: Arc<Metrics>,
}

impl StreamHandler {
    pub fn new(service: Arc<IngestService>, audit: AuditHandle) -> Result<Self, ServerError> {
        Ok(Self {
            service,
            audit,
            #[cfg(feature = "metrics")]
            metrics: Arc::new(Metrics::new()?),
        })
    }

    pub fn service(&self) -> &Arc<IngestService> {
        &self.service
    }

    async fn submit(&self, req: IngestRequest) -> Result<IngestResponse, ServerError> {
        if req.method != "POST" {
            return Err(ServerError::MethodNotAllowed);
        }

        let stream: Stream = serde_json::from_slice(&req.body)
            .map_err(|e| ServerError::InvalidJson(e.to_string()))?;
        let admission = self.service.submit(stream)?;

        IngestResponse::json(&SubmitAccepted {
            status: "processing_started".to_string(),
            count: admission.progress(),
            stream_id: admission.stream_id,
        })
    }

    async fn health_check(&self) -> Result<IngestResponse, ServerError> {
        IngestResponse::json(&serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    async fn stats(&self, req: &IngestRequest) -> Result<IngestResponse, ServerError> {
        let audit = self
            .audit
            .summary()
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        let mut body = serde_json::json!({
            "ingest": self.service.stats(),
            "audit": audit,
        });
        if let Some(limit) = req.query_params.get("recent") {
            let limit = limit.parse().unwrap_or(DEFAULT_RECENT);
            body["recent"] = serde_json::to_value(self.audit.recent(limit).await)?;
        }
        IngestResponse::json(&body)
    }

    #[cfg(feature = "metrics")]
    async fn metrics_endpoint(&self) -> Result<IngestResponse, ServerError> {
        Ok(IngestResponse {
            status_code: 200,
            headers: HashMap::from([("Content-Type".to_string(), "text/plain; version=0.0.4".to_string())]),
            body: self.metrics.export()?.into_bytes(),
        })
    }

    async fn route(&self, req: IngestRequest) -> Result<IngestResponse, ServerError> {
        match (req.path.as_str(), req.method.as_str()) {
            ("/", _) => self.submit(req).await,
            ("/health", "GET") => self.health_check().await,
            ("/stats", "GET") => self.stats(&req).await,
            #[cfg(feature = "metrics")]
            ("/metrics", "GET") => self.metrics_endpoint().await,
            ("/health" | "/stats", _) => Err(ServerError::MethodNotAllowed),
            #[cfg(feature = "metrics")]
            ("/metrics", _) => Err(ServerError::MethodNotAllowed),
            _ => Err(ServerError::NotFound),
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for StreamHandler {
    async fn handle_request(&self, req: IngestRequest) -> Result<IngestResponse, ServerError> {
        let started = Instant::now();
        let method = req.method.clone();
        let path = req.path.clone();

        let result = self.route(req).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        #[cfg(feature = "metrics")]
        self.metrics.observe(&path, outcome, started.elapsed());

        match &result {
            Err(ServerError::InvalidJson(detail)) => {
                tracing::warn!(%method, %path, %detail, "Rejected malformed body");
            }
            Err(ServerError::Internal(detail)) => {
                tracing::error!(%method, %path, %detail, "Handler error");
            }
            _ => {
                tracing::debug!(%method, %path, outcome, elapsed_us = started.elapsed().as_micros() as u64, "Handled request");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use streamwarden_engine::{AuditActor, EngineConfig, UserRegistry};

    fn handler(max: usize) -> StreamHandler {
        handler_with(EngineConfig::new(max))
    }

    fn handler_with(config: EngineConfig) -> StreamHandler {
        let audit = AuditActor::spawn(16);
        let service = IngestService::new(
            config,
            Arc::new(UserRegistry::seeded()),
            Arc::new(audit.clone()),
        )
        .unwrap();
        StreamHandler::new(Arc::new(service), audit).unwrap()
    }

    fn respond(result: Result<IngestResponse, ServerError>) -> IngestResponse {
        result.unwrap_or_else(IngestResponse::from)
    }

    fn body_json(resp: &IngestResponse) -> serde_json::Value {
        serde_json::from_slice(&resp.body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let handler = handler(5);
        let resp = respond(handler.handle_request(IngestRequest::new("GET", "/health")).await);
        assert_eq!(resp.status_code, 200);
        assert_eq!(body_json(&resp)["status"], "healthy");
    }

    #[tokio::test]
    async fn test_submit_accepted() {
        let handler = handler(5);
        let req = IngestRequest::new("POST", "/")
            .with_body(r#"{"streamId":"1","events":[{"type":"dir"}]}"#);

        let resp = respond(handler.handle_request(req).await);
        assert_eq!(resp.status_code, 200);
        let body = body_json(&resp);
        assert_eq!(body["status"], "processing_started");
        assert_eq!(body["streamId"], "1");
        assert_eq!(body["count"], "1/5");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        // Long grace keeps the capacity trigger from firing mid-test
        let handler = handler_with(EngineConfig::new(1).with_capacity_grace(Duration::from_secs(60)));

        let resp = respond(handler.handle_request(IngestRequest::new("GET", "/")).await);
        assert_eq!(resp.status_code, 405);
        assert_eq!(body_json(&resp)["error"], "Method not allowed");

        let resp = respond(handler.handle_request(IngestRequest::new("POST", "/").with_body("{not json")).await);
        assert_eq!(resp.status_code, 400);
        assert_eq!(body_json(&resp)["error"], "Invalid JSON");

        let ok = IngestRequest::new("POST", "/").with_body(r#"{"streamId":"1","events":[]}"#);
        assert_eq!(respond(handler.handle_request(ok.clone()).await).status_code, 200);

        let resp = respond(handler.handle_request(ok).await);
        assert_eq!(resp.status_code, 429);
        assert_eq!(body_json(&resp)["error"], "Maximum streams limit reached");

        let resp = respond(handler.handle_request(IngestRequest::new("GET", "/nope")).await);
        assert_eq!(resp.status_code, 404);
    }

    #[tokio::test]
    async fn test_stats_with_recent() {
        let handler = handler(5);
        let req = IngestRequest::new("POST", "/")
            .with_body(r#"{"streamId":"9","events":[{"type":"ssh","name":"guest","passwd":"T3mpPass!"}]}"#);
        respond(handler.handle_request(req).await);
        handler.service().drain().await;

        let resp = respond(
            handler
                .handle_request(IngestRequest::new("GET", "/stats").with_query("recent", "5"))
                .await,
        );
        assert_eq!(resp.status_code, 200);
        let body = body_json(&resp);
        assert_eq!(body["ingest"]["admitted"], 1);
        assert_eq!(body["audit"]["total"], 1);
        assert_eq!(body["recent"][0]["action"], "authenticated");
    }
}
