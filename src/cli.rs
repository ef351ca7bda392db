//! Command line interface for the `cdr-collect` binary.
//!
//! Kept free of crate dependencies so the build script can include it to
//! render the manual page.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::{Parser, ValueEnum};

/// Default address the collector listens on.
pub const DEFAULT_LISTEN_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 4));

/// What to do with a connection's remaining records after one fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OnFailure {
    /// Stop exporting the connection.
    #[default]
    Abort,
    /// Log the failure and carry on with the next record.
    Continue,
}

/// Command line arguments for the `cdr-collect` binary.
#[derive(Debug, Parser)]
#[command(
    name = "cdr-collect",
    version,
    about = "Collect call detail records from a PBX and forward them to UTM5 billing"
)]
pub struct Cli {
    /// Address to accept switch connections on.
    #[arg(long, value_name = "IP", default_value_t = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: IpAddr,

    /// Port to accept switch connections on.
    #[arg(long, value_name = "PORT", default_value_t = 5005)]
    pub listen_port: u16,

    /// Directory receiving cdr.raw, cdr.csv and sender files.
    #[arg(long, value_name = "DIR", default_value = "/var/log/cdr/")]
    pub storage: PathBuf,

    /// Billing sender executable.
    #[arg(long, value_name = "PATH", default_value = "/netup/utm5/bin/utm5_send_cdr")]
    pub utm5_sender: PathBuf,

    /// Configuration file handed to the billing sender.
    #[arg(long, value_name = "PATH", default_value = "/netup/utm5/utm5_send_cdr.cfg")]
    pub utm5_configuration: PathBuf,

    /// Behaviour after a record fails to export.
    #[arg(long, value_enum, default_value_t = OnFailure::Abort)]
    pub on_failure: OnFailure,

    /// Delete each sender file once the sender accepted it.
    #[arg(long)]
    pub remove_sent_files: bool,

    /// Largest chunk buffered while waiting for a delimiter, in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = 1024 * 1024)]
    pub max_chunk_length: usize,

    /// Serve Prometheus metrics on this socket address.
    #[arg(long, value_name = "SOCKET")]
    pub metrics_address: Option<SocketAddr>,
}

impl Cli {
    /// Socket address built from the listen address and port.
    #[must_use]
    pub fn listen(&self) -> SocketAddr { SocketAddr::new(self.listen_address, self.listen_port) }
}
