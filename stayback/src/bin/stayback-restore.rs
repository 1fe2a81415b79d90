//! Restore a backup job from S3 into the local backup directory.

use anyhow::Result;
use clap::Parser;
use stayback::restore::RestoreExecutor;
use stayback::shell::ProcessRunner;
use stayback::storage::AwsCliStore;
use stayback::{config, utils};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Job to restore (e.g. 20220306-070110). Defaults to the latest job.
    id: Option<String>,

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

    match run(args.id.as_deref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Restore failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(id: Option<&str>) -> Result<()> {
    tracing::debug!("Starting stayback-restore v{}", env!("CARGO_PKG_VERSION"));

    let config_path = config::default_config_path()?;
    let descriptor = config::from_file(&config_path)?;

    let store = Arc::new(AwsCliStore::new(Arc::new(ProcessRunner)));
    let result = RestoreExecutor::new(store).restore(descriptor, id).await?;

    tracing::info!(
        "Restored job {} from {} into {}",
        result.id,
        result.remote_uri,
        result.restore_dir.display()
    );
    Ok(())
}
