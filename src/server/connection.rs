//! Per-connection handling for [`CollectorServer`](super::CollectorServer).
//!
//! A connection is read to its end before anything is exported. Reading
//! moves between three states: waiting for the next frame, holding a decoded
//! chunk, and end of stream. At end of stream every collected chunk is
//! exported in arrival order and the connection is shut down, whether or not
//! the export succeeded.

use std::{net::SocketAddr, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, StreamExt};
use log::{error, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tokio_util::{codec::FramedRead, task::TaskTracker};

use crate::{
    codec::{Chunk, ChunkCodec},
    error::ExportError,
    export::{ChunkReport, Exporter},
    metrics,
};

/// RAII guard tracking the active connections gauge.
struct ActiveConnection;

impl ActiveConnection {
    fn new() -> Self {
        metrics::inc_connections();
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) { metrics::dec_connections(); }
}

/// Spawn a task to process a single TCP connection, logging and discarding
/// any panics.
pub(super) fn spawn_connection_task(
    stream: TcpStream,
    exporter: Arc<Exporter>,
    max_chunk_length: usize,
    tracker: &TaskTracker,
) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => Some(addr),
        Err(e) => {
            warn!("Failed to retrieve peer address: error={e}");
            None
        }
    };
    tracker.spawn(async move {
        let fut = AssertUnwindSafe(handle_connection(
            stream,
            peer_addr,
            &exporter,
            max_chunk_length,
        ))
        .catch_unwind();

        match fut.await {
            Ok(Ok(summary)) => {
                tracing::info!(chunks = summary.chunks, records = %summary.records, ?peer_addr, "connection exported");
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, kind = e.error_type(), ?peer_addr, "export aborted");
            }
            Err(panic) => {
                let panic_msg = crate::panic::format_panic(panic);
                // Emit via both `log` and `tracing` for tests that capture either.
                error!("connection task panicked: panic={panic_msg}, peer_addr={peer_addr:?}");
                tracing::error!(panic = %panic_msg, ?peer_addr, "connection task panicked");
            }
        }
    });
}

/// Totals for one connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Non-empty chunks read before end of stream.
    pub chunks: usize,
    /// Sum of the per-chunk export reports.
    pub records: ChunkReport,
}

enum ReadState {
    AwaitingData,
    HaveChunk(Chunk),
    Eof,
}

/// Read `stream` to its end, then export every chunk it carried.
///
/// The stream is shut down before returning on every path except a panic,
/// where dropping it closes the socket instead.
///
/// # Errors
///
/// Returns the first export failure when the exporter runs under
/// [`FailurePolicy::Abort`](crate::export::FailurePolicy::Abort); chunks
/// after the failing one are not exported.
pub async fn handle_connection<S>(
    stream: S,
    peer_addr: Option<SocketAddr>,
    exporter: &Exporter,
    max_chunk_length: usize,
) -> Result<ConnectionSummary, ExportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _active = ActiveConnection::new();
    tracing::info!(?peer_addr, "connection opened");

    let mut framed = FramedRead::new(stream, ChunkCodec::new(max_chunk_length));
    let chunks = read_chunks(&mut framed, peer_addr).await;
    let result = export_chunks(&chunks, exporter).await;

    let mut stream = framed.into_inner();
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(error = %e, ?peer_addr, "connection shutdown failed");
    }
    tracing::info!(?peer_addr, chunks = chunks.len(), "connection closed");
    result
}

async fn read_chunks<S>(
    framed: &mut FramedRead<S, ChunkCodec>,
    peer_addr: Option<SocketAddr>,
) -> Vec<Chunk>
where
    S: AsyncRead + Unpin,
{
    let mut chunks = Vec::new();
    let mut state = ReadState::AwaitingData;
    loop {
        state = match state {
            ReadState::AwaitingData => match framed.next().await {
                Some(Ok(frame)) => match Chunk::from_frame(&frame) {
                    Ok(Some(chunk)) => ReadState::HaveChunk(chunk),
                    Ok(None) => ReadState::AwaitingData,
                    Err(err) => {
                        tracing::warn!(error = %err, ?peer_addr, "dropping chunk");
                        metrics::inc_errors(err.error_type());
                        if err.should_disconnect() {
                            ReadState::Eof
                        } else {
                            ReadState::AwaitingData
                        }
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(error = %e, ?peer_addr, "read failed, ending connection");
                    metrics::inc_errors("read");
                    ReadState::Eof
                }
                None => {
                    tracing::debug!(?peer_addr, "connection closed by peer");
                    ReadState::Eof
                }
            },
            ReadState::HaveChunk(chunk) => {
                metrics::inc_chunks();
                chunks.push(chunk);
                ReadState::AwaitingData
            }
            ReadState::Eof => return chunks,
        };
    }
}

async fn export_chunks(
    chunks: &[Chunk],
    exporter: &Exporter,
) -> Result<ConnectionSummary, ExportError> {
    let mut summary = ConnectionSummary {
        chunks: chunks.len(),
        ..ConnectionSummary::default()
    };
    if chunks.is_empty() {
        return Ok(summary);
    }

    tracing::info!(chunks = chunks.len(), "saving chunks");
    for chunk in chunks {
        let report = exporter.export_chunk(chunk).await?;
        tracing::debug!(%report, bytes = chunk.len(), "chunk exported");
        summary.records.exported += report.exported;
        summary.records.failed += report.failed;
        summary.records.skipped += report.skipped;
    }
    Ok(summary)
}
