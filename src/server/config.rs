//! Construction and listener binding for [`CollectorServer`].

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::{net::TcpListener, sync::oneshot};

use super::{BackoffConfig, Bound, CollectorServer, ServerError, ServerState, Unbound};
use crate::{
    codec::{DEFAULT_CHUNK_LENGTH, clamp_chunk_length},
    export::Exporter,
};

impl CollectorServer<Unbound> {
    /// Create a new server exporting through `exporter`.
    ///
    /// The chunk length limit defaults to
    /// [`DEFAULT_CHUNK_LENGTH`](crate::codec::DEFAULT_CHUNK_LENGTH). The TCP
    /// listener is unset; call [`bind`](Self::bind) before running the
    /// server.
    #[must_use]
    pub fn new(exporter: Exporter) -> Self {
        Self {
            exporter: Arc::new(exporter),
            max_chunk_length: DEFAULT_CHUNK_LENGTH,
            ready_tx: None,
            backoff_config: BackoffConfig::default(),
            state: Unbound,
        }
    }

    /// Return `None` as the server is not bound.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }

    /// Bind to a fresh address.
    ///
    /// # Errors
    /// Returns a [`ServerError`] if binding or configuring the listener fails.
    pub fn bind(self, addr: SocketAddr) -> Result<CollectorServer<Bound>, ServerError> {
        let std_listener = StdTcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.bind_existing_listener(std_listener)
    }

    /// Bind to an existing `StdTcpListener`.
    ///
    /// # Errors
    /// Returns a [`ServerError`] if configuring the listener fails.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<CollectorServer<Bound>, ServerError> {
        std_listener
            .set_nonblocking(true)
            .map_err(ServerError::Bind)?;
        let listener = TcpListener::from_std(std_listener).map_err(ServerError::Bind)?;
        let CollectorServer {
            exporter,
            max_chunk_length,
            ready_tx,
            backoff_config,
            ..
        } = self;
        Ok(CollectorServer {
            exporter,
            max_chunk_length,
            ready_tx,
            backoff_config,
            state: Bound {
                listener: Arc::new(listener),
            },
        })
    }
}

impl<S> CollectorServer<S>
where
    S: ServerState,
{
    /// Limit the number of bytes buffered while waiting for a delimiter.
    ///
    /// Values are clamped to the codec's accepted range.
    #[must_use]
    pub fn max_chunk_length(mut self, limit: usize) -> Self {
        self.max_chunk_length = clamp_chunk_length(limit);
        self
    }

    /// Configure a channel used to signal when the server is ready to accept
    /// connections.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Override the back-off applied after failed `accept()` calls.
    #[must_use]
    pub fn accept_backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff_config = config.normalized();
        self
    }

    /// Returns the configured chunk length limit.
    #[inline]
    #[must_use]
    pub const fn chunk_length_limit(&self) -> usize { self.max_chunk_length }

    /// The exporter every connection feeds.
    #[must_use]
    pub fn exporter(&self) -> &Exporter { &self.exporter }
}

impl CollectorServer<Bound> {
    /// Returns the bound address, or `None` if retrieving it fails.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::{
        codec::{MAX_CHUNK_LENGTH, MIN_CHUNK_LENGTH},
        server::test_util::{exporter, free_listener},
    };

    #[rstest]
    fn new_server_is_unbound(exporter: Exporter) {
        let server = CollectorServer::new(exporter);
        assert!(server.local_addr().is_none());
        assert_eq!(server.chunk_length_limit(), DEFAULT_CHUNK_LENGTH);
    }

    #[rstest]
    #[case(0, MIN_CHUNK_LENGTH)]
    #[case(4096, 4096)]
    #[case(usize::MAX, MAX_CHUNK_LENGTH)]
    fn chunk_length_limit_is_clamped(
        exporter: Exporter,
        #[case] limit: usize,
        #[case] expected: usize,
    ) {
        let server = CollectorServer::new(exporter).max_chunk_length(limit);
        assert_eq!(server.chunk_length_limit(), expected);
    }

    #[rstest]
    fn accept_backoff_is_normalized(exporter: Exporter) {
        let server = CollectorServer::new(exporter).accept_backoff(BackoffConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::ZERO,
        });
        assert_eq!(
            server.backoff_config,
            BackoffConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(50),
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn binding_existing_listener_keeps_address(
        exporter: Exporter,
        free_listener: StdTcpListener,
    ) {
        let expected = free_listener.local_addr().expect("listener address");
        let server = CollectorServer::new(exporter)
            .max_chunk_length(4096)
            .bind_existing_listener(free_listener)
            .expect("bind");
        assert_eq!(server.local_addr(), Some(expected));
        assert_eq!(server.chunk_length_limit(), 4096);
    }

    #[rstest]
    #[tokio::test]
    async fn binding_busy_address_fails(exporter: Exporter, free_listener: StdTcpListener) {
        let addr = free_listener.local_addr().expect("listener address");
        let err = CollectorServer::new(exporter)
            .bind(addr)
            .err()
            .expect("address already in use");
        assert!(matches!(err, ServerError::Bind(_)));
    }
}
