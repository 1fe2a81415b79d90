//! Back up the configured directories to S3.

use anyhow::Result;
use clap::Parser;
use stayback::executor::BackupExecutor;
use stayback::shell::{CommandRunner, ProcessRunner};
use stayback::shutdown::ShutdownCoordinator;
use stayback::storage::AwsCliStore;
use stayback::{config, utils, Job, JobId};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = utils::logger::init(utils::logger::level_for_verbosity(args.verbose)) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Backup failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    tracing::debug!("Starting stayback-backup v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = config::default_config_path()?;
    let descriptor = config::from_file(&config_path)?;
    let job = Job::new(descriptor, JobId::now());

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
    let store = Arc::new(AwsCliStore::new(runner.clone()));

    let shutdown = ShutdownCoordinator::new();
    let listener = shutdown.listen();

    let executor = BackupExecutor::with_cancel(runner, store, shutdown.token());
    let result = executor.execute(job).await;

    shutdown.finish();
    let _ = listener.await;

    let result = result?;
    tracing::info!(
        "Backup {} complete: {} artifacts uploaded to {} in {}s",
        result.id,
        result.artifacts.len(),
        result.remote_uri,
        result.duration_secs
    );
    Ok(())
}
