//! Process configuration assembled from the command line.
//!
//! Every path is resolved once at startup. A [`CollectorConfig`] is immutable
//! afterwards and is handed to the server by value.

use std::{
    io,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use crate::{
    cli::{Cli, OnFailure},
    codec::clamp_chunk_length,
    export::{Exporter, FailurePolicy},
    sender::ExternalSender,
    storage::StorageLocation,
};

/// Errors raised while resolving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The storage directory is missing or not a directory.
    #[error("storage directory {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The sender executable or its configuration file cannot be resolved.
    #[error("sender {role} {}: {source}", .path.display())]
    Sender {
        role: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolved collector configuration.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Socket address switch connections arrive on.
    pub listen: SocketAddr,
    pub storage: StorageLocation,
    /// Sender with absolute program and configuration paths.
    pub sender: ExternalSender,
    pub failure_policy: FailurePolicy,
    pub remove_sent_files: bool,
    /// Chunk length limit, already clamped to the codec's range.
    pub max_chunk_length: usize,
    /// Address of the Prometheus endpoint, if any.
    pub metrics_address: Option<SocketAddr>,
}

impl From<OnFailure> for FailurePolicy {
    fn from(value: OnFailure) -> Self {
        match value {
            OnFailure::Abort => Self::Abort,
            OnFailure::Continue => Self::Continue,
        }
    }
}

impl CollectorConfig {
    /// Resolve the configuration described by `cli`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the storage directory, sender executable
    /// or sender configuration cannot be resolved to an existing path.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let storage =
            StorageLocation::resolve(&cli.storage).map_err(|source| ConfigError::Storage {
                path: cli.storage.clone(),
                source,
            })?;
        let program = absolute("executable", &cli.utm5_sender)?;
        let configuration = absolute("configuration", &cli.utm5_configuration)?;
        Ok(Self {
            listen: cli.listen(),
            storage,
            sender: ExternalSender::new(program, configuration),
            failure_policy: cli.on_failure.into(),
            remove_sent_files: cli.remove_sent_files,
            max_chunk_length: clamp_chunk_length(cli.max_chunk_length),
            metrics_address: cli.metrics_address,
        })
    }

    /// Build the exporter every connection shares.
    #[must_use]
    pub fn exporter(&self) -> Exporter {
        Exporter::new(self.storage.clone(), Arc::new(self.sender.clone()))
            .failure_policy(self.failure_policy)
            .remove_sent_files(self.remove_sent_files)
    }
}

fn absolute(role: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    std::fs::canonicalize(path).map_err(|source| ConfigError::Sender {
        role,
        path: path.to_path_buf(),
        source,
    })
}
