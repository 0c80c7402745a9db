//! stego: command-line front-end for the steganography service.
//!
//! Set STEGO_API_URL (or pass --config). Results are printed as JSON on stdout;
//! logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use stego_client::{
    Config, DisplayHandle, FormSession, Materialized, MediaAsset, MediaKind, Mode, Operation,
    TransferOrchestrator, submit_until_signal,
};

#[derive(Parser)]
#[command(name = "stego", about = "Hide and extract messages and files in media")]
struct Cli {
    /// JSON configuration file (defaults to the STEGO_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory artifacts are downloaded to
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a message or file inside a carrier
    Encode {
        /// image, audio, video or file-in-image
        #[arg(long)]
        mode: Mode,
        /// Carrier file
        #[arg(long)]
        carrier: PathBuf,
        /// Message to hide
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        message: Option<String>,
        /// File to hide (file-in-image mode)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Extract the hidden message or file from a carrier
    Decode {
        /// image, audio, video or file-in-image
        #[arg(long)]
        mode: Mode,
        /// Carrier file
        #[arg(long)]
        carrier: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize result")?;
    println!("{}", out);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::from_env().context(
            "Failed to load configuration. Set STEGO_API_URL or pass --config",
        )?,
    };
    if let Some(dir) = &cli.download_dir {
        config.download.download_dir = dir.clone();
    }
    Ok(config)
}

async fn load(path: &Path, kind: MediaKind) -> anyhow::Result<MediaAsset> {
    MediaAsset::from_path(path, kind)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn describe(mode: Mode, operation: Operation, materialized: &Materialized) -> serde_json::Value {
    let result = match &materialized.display {
        DisplayHandle::Remote(url) => serde_json::json!({ "kind": "reference", "url": url }),
        DisplayHandle::Local(handle) => serde_json::json!({
            "kind": "inline",
            "filename": handle.filename,
            "content_type": handle.content_type,
            "bytes": handle.len(),
            "sha256": handle.sha256,
        }),
        DisplayHandle::Text(text) => serde_json::json!({ "kind": "message", "message": text }),
    };

    serde_json::json!({
        "mode": mode,
        "operation": operation,
        "result": result,
        "download": materialized.download,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let orchestrator = TransferOrchestrator::new(config).context("Invalid configuration")?;

    let (mode, operation, session) = match cli.command {
        Commands::Encode {
            mode,
            carrier,
            message,
            file,
        } => {
            let session = FormSession::new(mode, &orchestrator);
            let carrier_kind = mode.profile().carrier_kind;
            session
                .select_encode_carrier(load(&carrier, carrier_kind).await?)
                .await
                .with_context(|| format!("Carrier {} rejected", carrier.display()))?;

            match (message, file) {
                (_, Some(file)) => session
                    .select_payload_file(load(&file, MediaKind::File).await?)
                    .await
                    .with_context(|| format!("File {} rejected", file.display()))?,
                (Some(message), None) => session.set_message(message).await?,
                (None, None) => anyhow::bail!("Pass --message or --file"),
            }

            (mode, Operation::Encode, session)
        }
        Commands::Decode { mode, carrier } => {
            let session = FormSession::new(mode, &orchestrator);
            let carrier_kind = mode.profile().carrier_kind;
            session
                .select_decode_carrier(load(&carrier, carrier_kind).await?)
                .await
                .with_context(|| format!("Carrier {} rejected", carrier.display()))?;

            (mode, Operation::Decode, session)
        }
    };

    let materialized = submit_until_signal(&session, operation)
        .await
        .with_context(|| format!("{} {} failed", mode, operation))?;
    print_json(&describe(mode, operation, &materialized))?;

    Ok(())
}
