//! Runtime control for [`CollectorServer`].

mod accept;
mod backoff;

#[cfg(test)]
pub(super) use accept::MockAcceptListener;
pub(super) use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use log::warn;
use tokio::{select, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Bound, CollectorServer, ServerError};

impl CollectorServer<Bound> {
    /// Run the server until a shutdown signal is received.
    ///
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use cdr_collect::{
    ///     export::Exporter,
    ///     sender::ExternalSender,
    ///     server::CollectorServer,
    ///     storage::StorageLocation,
    /// };
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let storage = StorageLocation::resolve("/var/log/cdr")?;
    /// let sender = ExternalSender::new(
    ///     "/netup/utm5/bin/utm5_send_cdr",
    ///     "/netup/utm5/utm5_send_cdr.cfg",
    /// );
    /// let server = CollectorServer::new(Exporter::new(storage, Arc::new(sender)))
    ///     .bind(([127, 0, 0, 1], 5005).into())?;
    /// server.run().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors; the `Result` is reserved for future runtime
    /// failures.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the server until the `shutdown` future resolves.
    ///
    /// Once `shutdown` completes no further connections are accepted.
    /// Connections already accepted are not cancelled; this method returns
    /// after they have finished exporting.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let CollectorServer {
            exporter,
            max_chunk_length,
            ready_tx,
            backoff_config,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(accept_loop(
            listener,
            AcceptLoopOptions {
                exporter,
                max_chunk_length,
                shutdown: shutdown_token.clone(),
                tracker: tracker.clone(),
                backoff: backoff_config,
            },
        ));

        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("Failed to send readiness signal: receiver dropped");
        }

        select! {
            () = shutdown => {
                tracing::info!("shutdown requested, no longer accepting connections");
                shutdown_token.cancel();
            }
            () = tracker.wait() => {},
        }

        tracker.close();
        tracker.wait().await;
        Ok(())
    }
}
