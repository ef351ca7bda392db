//! Shared fixtures for end-to-end collector tests.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use cdr_collect::{
    Exporter,
    ExternalSender,
    FailurePolicy,
    StorageLocation,
    server::CollectorServer,
    test_helpers::WireFields,
};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

pub use cdr_collect::test_helpers::framed;

/// Fixed-width record line with the given calling number and dialled code.
pub fn record_line(calling_num: &str, code_dial: &str) -> String {
    WireFields {
        calling_num,
        code_dial,
        ..WireFields::default()
    }
    .line()
}

/// A running collector writing into a temporary directory.
///
/// The sender is `/bin/sh` running a script that appends each sender file to
/// `sent.log`, rejecting any record whose calling number is `5550000`.
pub struct Collector {
    dir: TempDir,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

pub const REJECTED_CALLER: &str = "5550000";

impl Collector {
    pub async fn start(policy: FailurePolicy, remove_sent_files: bool) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storage = StorageLocation::resolve(dir.path()).expect("resolve storage");
        let script = format!(
            "if grep -q {REJECTED_CALLER} \"$1\"; then echo rejected; exit 1; fi; cat \"$1\" >> '{}'",
            dir.path().join("sent.log").display()
        );
        let exporter = Exporter::new(storage, Arc::new(ExternalSender::new("/bin/sh", script)))
            .failure_policy(policy)
            .remove_sent_files(remove_sent_files);

        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = CollectorServer::new(exporter)
            .ready_signal(ready_tx)
            .bind(([127, 0, 0, 1], 0).into())
            .expect("bind collector");
        let addr = server.local_addr().expect("bound address");
        let handle = tokio::spawn(async move {
            server
                .run_with_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("collector run failed");
        });
        ready_rx.await.expect("collector ready");

        Self {
            dir,
            addr,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Send `bytes` on a fresh connection and wait for the collector to
    /// finish exporting and close it.
    pub async fn deliver(&self, bytes: &[u8]) {
        let mut stream = TcpStream::connect(self.addr).await.expect("connect");
        stream.write_all(bytes).await.expect("write");
        stream.shutdown().await.expect("half-close");
        let mut rest = Vec::new();
        timeout(Duration::from_secs(10), stream.read_to_end(&mut rest))
            .await
            .expect("collector did not close the connection")
            .expect("read");
    }

    pub fn path(&self) -> &Path { self.dir.path() }

    pub fn lines(&self, name: &str) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join(name))
            .map(|text| text.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn exists(&self, name: &str) -> bool { self.dir.path().join(name).exists() }

    /// Sender files still present in the storage directory.
    pub fn sender_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .expect("read storage dir")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.chars().all(|c| c.is_ascii_digit()))
            })
            .collect()
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            timeout(Duration::from_secs(10), handle)
                .await
                .expect("collector did not stop")
                .expect("collector task panicked");
        }
    }
}
