//! Invocation of the external billing sender.
//!
//! The sender is a separate executable (UTM5's `utm5_send_cdr` by default)
//! run once per record as `<sender> -c <configuration> -s <file>`. It is run
//! from an argument vector; no shell ever sees the file name.

use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// The sender exited unsuccessfully.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("sender exited with {}: {}", exit_description(.status), .output.trim_end())]
pub struct CommandError {
    /// Exit code, or `None` when the process was killed by a signal.
    pub status: Option<i32>,
    /// Captured standard output, or standard error when stdout was empty,
    /// exactly as the sender wrote it.
    pub output: String,
}

impl CommandError {
    /// Build an error from captured process streams, preferring stdout.
    #[must_use]
    pub fn from_streams(status: Option<i32>, stdout: &[u8], stderr: &[u8]) -> Self {
        let stream = if stdout.is_empty() { stderr } else { stdout };
        Self {
            status,
            output: String::from_utf8_lossy(stream).into_owned(),
        }
    }
}

#[expect(
    clippy::ref_option,
    reason = "thiserror passes fields to format helpers by reference"
)]
fn exit_description(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_owned(), |code| format!("status {code}"))
}

/// Failures delivering a sender file.
#[derive(Debug, Error)]
pub enum SendError {
    /// The sender could not be started or awaited.
    #[error("failed to run sender {}: {source}", .program.display())]
    Spawn {
        /// Executable that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The sender ran and reported failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Delivers one sender file to the billing system.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CdrSender: Send + Sync {
    /// Submit the record stored in `file`.
    async fn send(&self, file: &Path) -> Result<(), SendError>;
}

/// Sender backed by an external executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalSender {
    program: PathBuf,
    configuration: PathBuf,
}

impl ExternalSender {
    /// Create a sender running `program` with `configuration`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, configuration: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            configuration: configuration.into(),
        }
    }

    /// Path of the sender executable.
    #[must_use]
    pub fn program(&self) -> &Path { &self.program }

    /// Path of the configuration passed with `-c`.
    #[must_use]
    pub fn configuration(&self) -> &Path { &self.configuration }

    fn command(&self, file: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg(&self.configuration)
            .arg("-s")
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        command
    }
}

#[async_trait]
impl CdrSender for ExternalSender {
    async fn send(&self, file: &Path) -> Result<(), SendError> {
        let output = self
            .command(file)
            .output()
            .await
            .map_err(|source| SendError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if output.status.success() {
            tracing::debug!(file = %file.display(), "sender accepted record");
            return Ok(());
        }
        Err(CommandError::from_streams(output.status.code(), &output.stdout, &output.stderr).into())
    }
}
