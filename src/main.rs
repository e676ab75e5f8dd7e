//! docsync - bulk JSON document transfer for MongoDB
//!
//! # Usage
//!
//! ```bash
//! # Upload ./upload/*.json into the "articles" collection
//! docsync --uri mongodb://localhost:27017/blog push --index articles
//!
//! # Download the collection into ./download
//! docsync --uri mongodb://localhost:27017/blog pull --index articles
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use docsync::cli::{CliInterface, Commands};
use docsync::connection::ConnectionManager;
use docsync::error::{Result, SyncError};
use docsync::store::{DocumentStore, MongoStore};
use docsync::transfer::{PaginatedExporter, PipelineCoordinator};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle informational subcommands or run a transfer
///
/// # Returns
/// * `Result<()>` - Success or error
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    let cancel_token = CancellationToken::new();
    let ctrl_c_handle = spawn_ctrl_c_listener(cancel_token.clone());

    debug!("Connecting to {}", cli.get_sanitized_connection_uri());
    let mut conn_manager = ConnectionManager::new(
        cli.get_connection_uri(),
        cli.config().connection.clone(),
    );
    conn_manager.connect().await?;

    let database = cli.get_database();
    debug!("Using database '{}'", database);
    let store: Arc<dyn DocumentStore> =
        Arc::new(MongoStore::new(conn_manager.get_database(&database)?));

    let result = run_transfer(&cli, store, &conn_manager.host_display(), &cancel_token).await;

    ctrl_c_handle.abort();
    conn_manager.disconnect().await?;
    result
}

/// Run the push or pull selected on the command line
async fn run_transfer(
    cli: &CliInterface,
    store: Arc<dyn DocumentStore>,
    host: &str,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let transfer = &cli.config().transfer;

    match &cli.args().command {
        Commands::Push { index, .. } => {
            status(cli, &format!("pushing objects to {}", host));

            let source = cli.source_dir();
            let coordinator =
                PipelineCoordinator::new(store, index.as_str(), source, transfer.bulk_size);
            let report = coordinator
                .with_progress_bar(transfer.progress_bar)
                .with_cancellation(cancel_token)
                .execute()
                .await?;

            println!("{}", report.throughput);
            status(cli, "done");
        }
        Commands::Pull { index, .. } => {
            status(cli, &format!("pulling objects from {}", host));

            let exporter =
                PaginatedExporter::new(store, index.as_str(), cli.dest_dir(), transfer.page_size);
            let report = exporter
                .with_retry_delay(cli.config().retry_delay())
                .with_max_retries(transfer.max_query_retries)
                .with_cancellation(cancel_token.clone())
                .execute()
                .await?;

            if report.cancelled {
                return Err(SyncError::Cancelled);
            }
            if report.documents_skipped > 0 {
                warn!("{} documents could not be written", report.documents_skipped);
            }
            status(cli, "done");
        }
        _ => {}
    }

    Ok(())
}

/// Print a status line unless in quiet mode
fn status(cli: &CliInterface, message: &str) {
    if !cli.is_quiet() {
        println!("{}", message);
    }
}

/// Cancel `token` on the first Ctrl+C
fn spawn_ctrl_c_listener(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("Interrupted, stopping...");
                token.cancel();
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    })
}

/// Initialize logging system based on verbosity level
///
/// CLI verbosity flags have already been folded into the configured level.
///
/// # Arguments
/// * `cli` - CLI interface with the effective configuration
fn initialize_logging(cli: &CliInterface) {
    let level = cli.config().logging.level.to_tracing_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
