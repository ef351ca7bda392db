//! Tokio-based TCP server feeding switch connections into an [`Exporter`].
//!
//! `CollectorServer` accepts connections on a single listener and spawns one
//! task per connection. Each task reads the stream to its end, framing it
//! into chunks, then exports the chunks in arrival order. Connections share
//! nothing but the immutable exporter configuration.

use std::sync::Arc;

use tokio::{net::TcpListener, sync::oneshot};

use crate::export::Exporter;

/// Tokio-based server collecting call detail records.
///
/// The server carries a typestate `S` indicating whether it is [`Unbound`]
/// (not yet bound to a TCP listener) or [`Bound`]. New servers start
/// `Unbound` and must call [`CollectorServer::bind`] or
/// [`CollectorServer::bind_existing_listener`] before running. The server
/// listens for a shutdown signal using `tokio::signal::ctrl_c` and then stops
/// accepting new connections, letting in-flight ones finish.
pub struct CollectorServer<S = Unbound>
where
    S: ServerState,
{
    pub(crate) exporter: Arc<Exporter>,
    pub(crate) max_chunk_length: usize,
    /// Channel used to notify when the server is ready.
    ///
    /// A `oneshot::Sender` can transmit only one readiness notification, so a
    /// new `ready_tx` must be provided each time the server is started.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) backoff_config: BackoffConfig,
    /// Typestate tracking whether the server has been bound to a listener.
    pub(crate) state: S,
}

/// Marker indicating the server has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the server is bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod config;
mod connection;
pub mod error;
mod runtime;

pub use connection::{ConnectionSummary, handle_connection};
pub use error::ServerError;
/// Re-exported configuration types for server backoff behaviour.
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;
