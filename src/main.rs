//! pdf-workman - PDF manipulation worker.
//!
//! Applies redactions, rotations, deletions, and document splits to a single
//! loan-file PDF per invocation, then persists the result to object storage
//! and relational metadata.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if pdf_workman::cli::is_verbose() {
        "pdf_workman=info"
    } else {
        "pdf_workman=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    pdf_workman::cli::run().await
}
