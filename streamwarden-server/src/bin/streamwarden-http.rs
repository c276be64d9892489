// Streamwarden HTTP ingest server
// Admits up to --max streams, then shuts down after a short grace delay or on the global timeout

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamwarden_engine::{
    AuditActor, DrainOutcome, EngineConfig, IngestService, ShutdownReason, UserRegistry,
};
use streamwarden_server::{http, RequestHandler, StreamHandler};

#[derive(Parser, Debug)]
#[command(name = "streamwarden-http", version, about = "Concurrent session-stream auth processor")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "STREAMWARDEN_BIND", default_value = "0.0.0.0:8081")]
    bind: String,

    /// Maximum number of streams to admit
    #[arg(long = "max", env = "STREAMWARDEN_MAX_STREAMS")]
    max_streams: Option<usize>,

    /// Global timeout in seconds
    #[arg(long, env = "STREAMWARDEN_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Delay between admitting the last stream and shutting down, in milliseconds
    #[arg(long, env = "STREAMWARDEN_GRACE_MS")]
    grace_ms: Option<u64>,

    /// Upper bound on waiting for in-flight streams after shutdown, in seconds
    #[arg(long, env = "STREAMWARDEN_DRAIN_SECS")]
    drain_secs: Option<u64>,

    /// Recent audit entries kept for /stats
    #[arg(long, default_value_t = 1024)]
    audit_capacity: usize,
}

impl Args {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig::from_env()?;
        if let Some(max) = self.max_streams {
            config = config.with_max_streams(max);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_global_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = self.grace_ms {
            config = config.with_capacity_grace(Duration::from_millis(ms));
        }
        if let Some(secs) = self.drain_secs {
            config = config.with_drain_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "streamwarden_server=info,streamwarden_http=info,streamwarden_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.engine_config()?;
    tracing::info!(
        max_streams = config.max_streams,
        timeout_secs = config.global_timeout.as_secs(),
        "Starting streamwarden"
    );

    let audit = AuditActor::spawn(args.audit_capacity);
    let service = Arc::new(IngestService::new(
        config,
        Arc::new(UserRegistry::seeded()),
        Arc::new(audit.clone()),
    )?);
    let _armed = service.arm();

    // Ctrl-C counts as a third shutdown trigger
    let signal = service.signal().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && signal.fire(ShutdownReason::Interrupted) {
            tracing::info!("Interrupted, shutting down");
        }
    });

    let handler: Arc<dyn RequestHandler> = Arc::new(StreamHandler::new(Arc::clone(&service), audit.clone())?);
    let app = http::router(handler);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!("Streamwarden HTTP server listening on {}", args.bind);

    let stop = service.signal().clone();
    let server = tokio::spawn(http::serve(listener, app, async move {
        stop.wait().await;
    }));

    let reason = service.wait_shutdown().await;
    let stats = service.stats();
    tracing::info!(
        %reason,
        admitted = stats.admitted,
        processing_us = stats.processing_micros,
        "Shutdown signalled"
    );

    if let Some(DrainOutcome::TimedOut { stragglers }) = http::wind_down(&service, server).await {
        tracing::warn!(stragglers, "Exiting with unfinished streams");
    }

    let stats = service.stats();
    if let Ok(summary) = audit.summary().await {
        tracing::info!(
            completed = stats.completed,
            processing_us = stats.processing_micros,
            audit_total = summary.total,
            denials = summary.denials,
            "Streamwarden stopped"
        );
    }
    Ok(())
}
