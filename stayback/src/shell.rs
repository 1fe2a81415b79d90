//! External command execution.
//!
//! tar, gpg and the S3 CLI are run through [`CommandRunner`] so the pipeline
//! can be exercised without spawning processes.

use crate::utils::errors::{Result, StaybackError};
use async_trait::async_trait;
use tracing::{debug, trace};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,

    /// stdout alone, for callers that parse it
    pub stdout: String,

    /// stdout followed by stderr
    pub combined_output: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion. A non-zero exit is returned as
    /// [`StaybackError::Command`].
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!("running: {} {}", program, args.join(" "));

        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut combined_output = stdout.clone();
        combined_output.push_str(&String::from_utf8_lossy(&output.stderr));
        trace!("{} output: {}", program, combined_output);

        if !output.status.success() {
            return Err(StaybackError::Command {
                program: program.to_string(),
                exit_code: output.status.code(),
                output: combined_output,
            });
        }

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or_default(),
            stdout,
            combined_output,
        })
    }
}

/// Build an owned argument list from string slices
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}
