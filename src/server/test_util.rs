//! Test helpers shared across server modules.

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use rstest::fixture;

use super::{Bound, CollectorServer};
use crate::{export::Exporter, sender::MockCdrSender, storage::StorageLocation};

#[fixture]
/// Exporter over the system temp directory whose sender expects no calls.
///
/// Only suitable for tests that never deliver a record.
pub fn exporter() -> Exporter {
    let storage =
        StorageLocation::resolve(std::env::temp_dir()).expect("resolve temp dir as storage");
    Exporter::new(storage, Arc::new(MockCdrSender::new()))
}

#[fixture]
/// Returns a bound [`TcpListener`](StdTcpListener) on a free port for use in
/// tests.
///
/// Keeping the listener bound prevents race conditions where another
/// process could claim the port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

pub fn bind_server(exporter: Exporter, listener: StdTcpListener) -> CollectorServer<Bound> {
    CollectorServer::new(exporter)
        .bind_existing_listener(listener)
        .expect("Failed to bind")
}
