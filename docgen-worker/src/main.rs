//! `docgen-worker`: the binary entry point (§12). Loads config, wires the
//! ledger/queue/storage clients, installs signal handling, and runs the
//! drain-and-wait listener loop until interrupted.

mod cli;
mod coordinator;
mod logging;
mod signals;

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use docgen_config::WorkerConfig;
use docgen_core::JobError;
use docgen_ledger::{Ledger, Listener, QueueConnection};
use docgen_storage::{S3Config, StorageClient};

use crate::cli::Cli;
use crate::coordinator::Coordinator;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("docgen-worker: {}", e.log_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), JobError> {
    let config = WorkerConfig::from_file(&cli.config).map_err(|e| e.into_job_error())?;
    config.validate().map_err(|e| e.into_job_error())?;

    logging::init(&config.logging).map_err(|e| JobError::unexpected(e.to_string()))?;

    tracing::info!(
        workdir = %cli.workdir.display(),
        config = %cli.config.display(),
        "starting docgen-worker"
    );

    std::fs::create_dir_all(&cli.workdir)
        .map_err(|e| JobError::config_missing(format!("workdir {}: {e}", cli.workdir.display())))?;

    let ledger = Ledger::connect(&config.database.connection_string)
        .await
        .map_err(|e| JobError::unavailable(e.to_string()))?;

    let queue = QueueConnection::connect(&config.database.connection_string)
        .await
        .map_err(|e| JobError::unavailable(e.to_string()))?;
    let mut listener = Listener::new(ledger, queue, config.database.queue_timeout());

    let s3_config = S3Config::new(
        config.s3.url.clone(),
        config.s3.username.clone(),
        config.s3.password.clone(),
        config.s3.bucket.clone(),
        config.s3.region.clone(),
    );
    let storage = StorageClient::new(&s3_config)
        .await
        .map_err(|e| JobError::unavailable(e.to_string()))?;
    storage
        .ensure_bucket()
        .await
        .map_err(|e| JobError::unavailable(e.to_string()))?;

    let coordinator = Coordinator::new(storage, config, cli.workdir.clone());

    let interrupted = Arc::new(AtomicBool::new(false));
    signals::install(interrupted.clone());

    listener.run(interrupted, &coordinator).await;

    tracing::info!("docgen-worker exiting");
    Ok(())
}
