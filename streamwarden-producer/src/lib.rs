//! # Streamwarden Producer
//!
//! Client side of the ingest protocol: submits parsed streams to a
//! streamwarden server, one POST per stream, and exposes the parsed input as
//! JSON for inspection.
//!
//! Delivery is at most once: a non-200 answer is reported, never retried.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use streamwarden_engine::{parser, EngineError, Stream};

/// Default submission endpoint
pub const DEFAULT_TARGET: &str = "http://localhost:8081/";

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Invalid target URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Processor returned status: {status}")]
    Rejected { status: u16, body: String },

    #[error("Input error: {0}")]
    Input(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, ProducerError>;

/// Per-run delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendSummary {
    pub sent: usize,
    pub failed: Vec<String>,
}

/// HTTP client posting streams to one target
#[derive(Debug, Clone)]
pub struct ProducerClient {
    client: reqwest::Client,
    target: Url,
}

impl ProducerClient {
    pub fn new(target: &str) -> Result<Self> {
        Self::with_timeout(target, Duration::from_secs(30))
    }

    pub fn with_timeout(target: &str, timeout: Duration) -> Result<Self> {
        let target = Url::parse(target)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, target })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// POST one stream; any status other than 200 is an error
    pub async fn send_stream(&self, stream: &Stream) -> Result<()> {
        let response = self.client.post(self.target.clone()).json(stream).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Send every stream in order, logging the result of each
    pub async fn send_all(&self, streams: &[Stream]) -> SendSummary {
        let mut summary = SendSummary::default();
        for stream in streams {
            match self.send_stream(stream).await {
                Ok(()) => {
                    tracing::info!(stream_id = %stream.stream_id, "Successfully sent stream");
                    summary.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(stream_id = %stream.stream_id, error = %e, "Failed to send stream");
                    summary.failed.push(stream.stream_id.clone());
                }
            }
        }
        summary
    }
}

/// Parse a stream file
pub fn load_streams(path: impl AsRef<Path>) -> Result<Vec<Stream>> {
    Ok(parser::parse_file(path)?)
}

/// Router answering `GET /` with every parsed stream as JSON
pub fn dump_router(streams: Arc<Vec<Stream>>) -> Router {
    Router::new().route(
        "/",
        get(move || {
            let streams = Arc::clone(&streams);
            async move { Json(streams.as_ref().clone()) }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_target() {
        let err = ProducerClient::new("not a url").unwrap_err();
        assert!(matches!(err, ProducerError::InvalidUrl(_)));
    }

    #[test]
    fn test_rejected_display() {
        let err = ProducerError::Rejected {
            status: 429,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "Processor returned status: 429");
    }
}
