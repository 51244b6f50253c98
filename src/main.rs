use anyhow::Result;
use clap::Parser;
use datalens::{
    acquire::AcquisitionHandle,
    fetch::{AnyFetcher, AssetRoot},
    present::present,
    AcquisitionState, Config,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Load an analysis dataset and print its preview")]
struct Args {
    /// Page location whose last path segment is the analysis id.
    location: String,
    /// YAML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the asset root (URL or directory).
    #[arg(long)]
    root: Option<String>,
    /// Load this file as a manual upload after the automatic attempt.
    #[arg(long)]
    upload: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,datalens=debug"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) config ───────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(root) = args.root {
        config.asset_root = root;
    }
    let root: AssetRoot = config.asset_root()?;
    info!(?root, location = %args.location, "startup");

    // ─── 3) automatic attempt ────────────────────────────────────────
    let handle = AcquisitionHandle::spawn(AnyFetcher::for_root(root), config.acquire_settings());
    handle.mount(&args.location);
    let mut snapshot = handle.wait_settled().await;

    // ─── 4) optional manual upload ───────────────────────────────────
    if let Some(path) = args.upload {
        info!(path = %path.display(), "manual upload");
        handle.upload_file(path);
        snapshot = handle.wait_settled().await;
    }

    // ─── 5) report ───────────────────────────────────────────────────
    let presentation = match &snapshot.state {
        AcquisitionState::Ready(dataset) => {
            Some(present(dataset, config.preview_rows, config.chart_rows))
        }
        AcquisitionState::Failed { message } => {
            error!("{}; retry with --upload <file>", message);
            None
        }
        AcquisitionState::Loading => None,
    };

    let out = json!({
        "state": snapshot.state,
        "log": snapshot.log.render(),
        "presentation": presentation,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    if matches!(snapshot.state, AcquisitionState::Failed { .. }) {
        std::process::exit(1);
    }
    Ok(())
}
