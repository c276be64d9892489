// Axum binding for any RequestHandler
// Every path goes through the fallback so routing stays inside the handler

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use streamwarden_engine::{DrainOutcome, IngestService};

use crate::{IngestRequest, IngestResponse, RequestHandler, ServerError};

/// Upper bound on a submitted body
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Convert axum::Request to IngestRequest
pub async fn to_ingest_request(req: axum::extract::Request) -> Result<IngestRequest, ServerError> {
    let (parts, body) = req.into_parts();

    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    let query_params: HashMap<String, String> = parts
        .uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ServerError::InvalidJson(format!("unreadable body: {}", e)))?;

    Ok(IngestRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        headers,
        body: body.to_vec(),
        query_params,
    })
}

/// Convert IngestResponse to axum::Response
pub fn from_ingest_response(resp: IngestResponse) -> Response {
    let mut builder = Response::builder().status(resp.status_code);
    for (key, value) in resp.headers {
        builder = builder.header(key, value);
    }

    match builder.body(axum::body::Body::from(resp.body)) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Generic handler endpoint
async fn handle_request(
    State(handler): State<Arc<dyn RequestHandler>>,
    req: axum::extract::Request,
) -> Response {
    let result = match to_ingest_request(req).await {
        Ok(ingest_req) => handler.handle_request(ingest_req).await,
        Err(e) => Err(e),
    };
    from_ingest_response(result.unwrap_or_else(IngestResponse::from))
}

/// Build the router serving `handler` on every path
pub fn router(handler: Arc<dyn RequestHandler>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(handler)
}

/// Serve until `shutdown` resolves, then stop accepting and finish open requests
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

/// Drain stream tasks and let the server finish open connections
///
/// Both share one drain bound. Returns `None` when the bound expired first.
pub async fn wind_down(
    service: &IngestService,
    server: JoinHandle<std::io::Result<()>>,
) -> Option<DrainOutcome> {
    let bound = service.config().drain_timeout;
    match tokio::time::timeout(bound, async { tokio::join!(service.drain(), server) }).await {
        Ok((outcome, joined)) => {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Server error: {}", e),
                Err(e) => tracing::error!("Server task failed: {}", e),
            }
            Some(outcome)
        }
        Err(_) => {
            tracing::warn!(
                drain_secs = bound.as_secs_f64(),
                "Streams or connections still open after drain bound, closing"
            );
            None
        }
    }
}
