//! Narrated video worker binary.
//!
//! Usage: `reel-worker <job.json>` runs one job and prints the final video
//! path; `reel-worker --schema` prints the job JSON schema.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_catalog::{CatalogConfig, KeywordExtractor, LibraryCatalog};
use reel_media::{check_ffmpeg, check_ffprobe, FfmpegEngine};
use reel_models::PipelineJob;
use reel_tts::TtsClient;
use reel_worker::error::ErrorKind;
use reel_worker::{Orchestrator, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reel=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let arg = std::env::args()
        .nth(1)
        .context("usage: reel-worker <job.json> | --schema")?;

    if arg == "--schema" {
        let schema = schemars::schema_for!(PipelineJob);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr.parse().context("invalid METRICS_ADDR")?;
        reel_worker::metrics::init_metrics(addr)?;
        info!("Serving metrics on {}", addr);
    }

    let raw = tokio::fs::read(&arg)
        .await
        .with_context(|| format!("failed to read job file {}", arg))?;
    let job: PipelineJob = serde_json::from_slice(&raw).context("invalid job JSON")?;

    info!("Starting reel-worker for job {}", job.id);

    check_ffmpeg()?;
    check_ffprobe()?;

    // Load configuration
    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);
    let catalog_config = CatalogConfig::from_env();
    let keyword_count = catalog_config.keyword_count;

    // Ctrl-C cancels the running job and kills any FFmpeg child
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, cancelling job");
            let _ = cancel_tx.send(true);
        }
    });

    let engine = Arc::new(FfmpegEngine::new(config.encoding.clone()).with_cancel(cancel_rx.clone()));
    let tts = Arc::new(TtsClient::from_env()?);
    let catalog = Arc::new(LibraryCatalog::open(catalog_config).await?);

    let orchestrator = Orchestrator::new(config, engine, tts, catalog)
        .with_keyword_extractor(KeywordExtractor::new(keyword_count));

    match orchestrator.run(job, cancel_rx).await {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            error!(stage = %e.stage, kind = %e.kind(), "Job failed: {}", e);
            let code = match e.kind() {
                ErrorKind::Caller => 2,
                ErrorKind::Collaborator => 3,
                ErrorKind::Internal => 4,
                ErrorKind::Cancelled => 130,
            };
            std::process::exit(code);
        }
    }
}
