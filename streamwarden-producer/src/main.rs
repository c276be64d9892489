// Streamwarden producer
// Parses a stream file, submits each stream to the processor, then serves the parsed streams

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamwarden_producer::{dump_router, load_streams, ProducerClient, DEFAULT_TARGET};

#[derive(Parser, Debug)]
#[command(name = "streamwarden-producer", version, about = "Submit session streams to a streamwarden server")]
struct Args {
    /// Path to the stream file
    #[arg(long, env = "STREAMWARDEN_FILE", default_value = "./data/streams5.txt")]
    file: PathBuf,

    /// Processor endpoint
    #[arg(long, env = "STREAMWARDEN_TARGET", default_value = DEFAULT_TARGET)]
    target: String,

    /// Address of the JSON dump endpoint
    #[arg(long, env = "STREAMWARDEN_DUMP_BIND", default_value = "0.0.0.0:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "streamwarden_producer=info,streamwarden_engine=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let streams = load_streams(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    tracing::info!(streams = streams.len(), file = %args.file.display(), "Parsed stream file");

    let client = ProducerClient::new(&args.target)?;
    let summary = client.send_all(&streams).await;
    tracing::info!(
        sent = summary.sent,
        failed = summary.failed.len(),
        target = %client.target(),
        "Submission finished"
    );

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!("Serving parsed streams on {}", args.bind);
    axum::serve(listener, dump_router(Arc::new(streams))).await?;
    Ok(())
}
