#![doc(html_root_url = "https://docs.rs/cdr-collect/latest")]
//! Public API for the `cdr-collect` library.
//!
//! A PBX streams call detail records over TCP as ASCII text, with records
//! grouped into chunks terminated by three NUL bytes. This crate frames those
//! chunks, decodes the fixed-width record lines, archives them and hands each
//! record to the UTM5 billing sender.

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod metrics;
pub mod panic;
pub mod record;
pub mod sender;
pub mod server;
pub mod storage;
pub mod test_helpers;

pub use codec::{Chunk, ChunkCodec, DELIMITER};
pub use config::{CollectorConfig, ConfigError};
pub use error::{ExportError, Result};
pub use export::{ChunkReport, Exporter, FailurePolicy};
pub use metrics::{CHUNKS_RECEIVED, CONNECTIONS_ACTIVE, ERRORS_TOTAL, RECORDS_EXPORTED};
pub use record::{CallRecord, RecordError};
pub use sender::{CdrSender, CommandError, ExternalSender, SendError};
pub use server::{CollectorServer, ServerError};
pub use storage::StorageLocation;
