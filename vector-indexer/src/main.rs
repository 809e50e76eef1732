//! Vector Indexer
//!
//! Reads embedded documents from a JSON Lines file and bulk-loads them into
//! an OpenSearch vector index.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vector_indexer::loader::{read_documents, summarize, summarize_failed_run, IngestReport};
use vector_indexer::{Dependencies, IndexingError, Settings};

#[derive(Parser, Debug)]
#[command(name = "vector-indexer")]
#[command(about = "Bulk-load embedded documents into an OpenSearch vector index")]
#[command(version)]
struct Cli {
    /// JSON Lines file with one document per line
    input: PathBuf,

    /// Target index (overrides VECTOR_INDEX)
    #[arg(short, long)]
    index: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<IngestReport, IndexingError> {
    let mut settings = Settings::from_env()?;
    if let Some(index) = cli.index {
        settings.index_name = index;
    }

    let file = File::open(&cli.input)?;
    let documents = read_documents(BufReader::new(file))?;
    info!(
        input = %cli.input.display(),
        documents = documents.len(),
        "Loaded documents"
    );

    let deps = Dependencies::new(&settings).await?;

    let responses = tokio::select! {
        result = deps.indexer.submit_chunked(&deps.index_name, &documents) => match result {
            Ok(responses) => responses,
            Err(e) => {
                if let Some(report) = summarize_failed_run(&e, settings.chunk_size) {
                    warn!(
                        failed = report.failed,
                        succeeded = report.succeeded,
                        "Run stopped after partial ingest"
                    );
                }
                return Err(e.into());
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning in-flight bulk request");
            return Err(IndexingError::Cancelled);
        }
    };

    summarize(&responses, settings.chunk_size)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    match run(Cli::parse()).await {
        Ok(report) if report.failed == 0 => ExitCode::SUCCESS,
        Ok(report) => {
            error!(failed = report.failed, "Some documents were rejected");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "Vector indexer failed");
            ExitCode::FAILURE
        }
    }
}
