//! CLI invocation surface (spec §6.1): a manual harness around
//! [`crate::pipeline::Pipeline::run`] for exercising and smoke-testing a
//! deployment outside of whatever real scheduler invokes it in production.

use std::io::Read as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::invocation::{InvocationPayload, Operation};
use crate::object_store::s3::S3ObjectStore;
use crate::pdf_engine::pdfium::PdfiumEngine;
use crate::pipeline::Pipeline;
use crate::progress::ProgressReporter;
use crate::repository::{DbPool, MetadataStore};

#[derive(Parser)]
#[command(name = "pdf-workman", version, about = "PDF manipulation worker")]
struct Cli {
    /// Increase log verbosity (equivalent to RUST_LOG=pdf_workman=info).
    #[arg(short, long, global = true, env = "PDF_WORKMAN_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one invocation payload (spec §6) and print the response as JSON.
    Run {
        /// Path to a JSON payload file. Reads stdin when omitted.
        payload: Option<PathBuf>,
    },
    /// Smoke-test DB/object-store/PDF-engine connectivity for one document.
    HealthCheck {
        #[arg(long)]
        image_id: i64,
    },
}

/// Read once at startup by `main` to pick the default log filter before the
/// rest of the CLI (and its `clap` parsing) runs.
pub fn is_verbose() -> bool {
    std::env::args().any(|a| a == "-v" || a == "--verbose")
        || std::env::var("PDF_WORKMAN_VERBOSE").is_ok()
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let pipeline = build_pipeline(&settings).await?;

    let payload = match cli.command {
        Command::Run { payload } => read_payload(payload)?,
        Command::HealthCheck { image_id } => InvocationPayload {
            operation: Operation::HealthCheck,
            image_id,
            session_id: None,
            timeout: None,
            progress_callback_url: None,
            bookmarks: Vec::new(),
            metadata: None,
        },
    };

    let response = pipeline.run(payload).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    std::process::exit(response.exit_code());
}

fn read_payload(path: Option<PathBuf>) -> anyhow::Result<InvocationPayload> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

async fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "pdf_workman.sqlite3".to_string());

    let pool = DbPool::from_url(&database_url)?;
    if pool.is_sqlite() {
        crate::repository::migrations::run_sqlite_migrations(&database_url).await?;
    }
    let store = MetadataStore::new(pool);

    let objects = S3ObjectStore::from_env(settings.bucket_name.clone()).await;
    let engine = PdfiumEngine::new()?;
    let progress = ProgressReporter::new(
        settings.progress_callback_url.clone(),
        settings.progress_callbacks_enabled,
        settings.callback_timeout,
    );

    Ok(Pipeline::new(
        store,
        Box::new(objects),
        Box::new(engine),
        progress,
        settings.default_deadline,
    ))
}

