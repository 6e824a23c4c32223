//! vsi-ai - Vessel Safety Inspection hazard classifier
//!
//! **Module Identity:**
//! - Name: vsi-ai (Hazard Classification)
//! - Port: 5801 (serve mode)
//!
//! Classifies vessel inspection photographs as fire hazard, trip/fall hazard
//! or no hazard. Runs as an HTTP service (`serve`) or over local files
//! (`analyze`).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vsi_common::config::TomlConfig;

use vsi_ai::config::{inference_timeout, resolve_provider_settings};
use vsi_ai::models::ImageRef;
use vsi_ai::services::azure_openai::AzureOpenAiProvider;
use vsi_ai::services::{BatchAggregator, DualPassAssessor, InferenceClient, UploadStore};
use vsi_ai::utils::RetryPolicy;
use vsi_ai::{build_router, AppState};

const MODULE_NAME: &str = "vsi-ai";

#[derive(Debug, Parser)]
#[command(name = "vsi-ai", version, about = "Vessel photo hazard classification")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "VSI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Root folder for uploads
    #[arg(long, env = "VSI_ROOT_FOLDER", global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    /// Service options used when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Debug, Clone, clap::Args)]
struct ServeArgs {
    /// HTTP listen port
    #[arg(long, env = "VSI_AI_PORT", default_value_t = 5801)]
    port: u16,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve(ServeArgs),
    /// Analyze local photo files and print the result as JSON
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load(args.config.as_deref(), MODULE_NAME)
        .context("Failed to load configuration")?;

    init_tracing(&toml_config)?;

    info!("Starting vsi-ai (Hazard Classification)");
    info!(
        "Version: {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let aggregator = build_aggregator(&toml_config)?;

    match args.command.unwrap_or(Command::Serve(args.serve)) {
        Command::Serve(ServeArgs { port }) => {
            let root_folder =
                vsi_common::config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
            info!("Root folder: {}", root_folder.display());

            let uploads = UploadStore::open(root_folder.join("uploads"))
                .map_err(|e| anyhow::anyhow!("Failed to initialize upload store: {}", e))?;
            info!("Upload store: {}", uploads.dir().display());

            let state = AppState::new(aggregator, uploads).with_limits(
                toml_config.analysis.max_files,
                toml_config.analysis.max_upload_bytes,
            );
            serve(state, port).await
        }
        Command::Analyze { files, output } => analyze_files(&aggregator, &files, output.as_deref()).await,
    }
}

fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);

    match &toml_config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

fn build_aggregator(toml_config: &TomlConfig) -> Result<BatchAggregator> {
    let settings = resolve_provider_settings(toml_config)?;
    let provider = AzureOpenAiProvider::new(settings)?;
    info!("Inference endpoint: {}", provider.url());

    let client = InferenceClient::new(Arc::new(provider), inference_timeout(toml_config));
    info!(
        provider = client.provider_id(),
        timeout_secs = client.timeout().as_secs(),
        "Inference client ready"
    );

    let analysis = &toml_config.analysis;
    let retry = RetryPolicy::from_config(analysis);
    let assessor = DualPassAssessor::new(client, retry)
        .with_token_limits(analysis.descriptive_max_tokens, analysis.checker_max_tokens);

    let aggregator = BatchAggregator::new(assessor, analysis.chunk_size);
    info!(
        chunk_size = aggregator.chunk_size(),
        max_retries = retry.max_retries,
        "Analysis pipeline configured"
    );
    Ok(aggregator)
}

async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vsi-ai stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn analyze_files(
    aggregator: &BatchAggregator,
    files: &[PathBuf],
    output: Option<&Path>,
) -> Result<()> {
    let images = ImageRef::from_paths(files);

    let result = aggregator.run(&images).await?;
    let json = serde_json::to_string_pretty(&result)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Result written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
