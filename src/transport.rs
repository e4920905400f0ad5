//! Transport abstraction for the connection layer.
//!
//! [`Client`](crate::Client) never opens sockets itself: a [`Connector`] hands
//! it a [`Connection`] on connect. Every outbound frame goes through the
//! [`Transport`]; inbound frame bodies arrive on the connection's channel and
//! are read by a dedicated task in the client.
//! The `full` feature provides a WebSocket implementation in
//! [`socket`](crate::socket); tests plug in in-memory ones.

use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Inbound frames buffered between the socket reader and the client.
pub const INBOUND_CAPACITY: usize = 64;

/// Async trait for a connection transport (e.g. WebSocket, Noise over WebSocket).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one frame. Returns once the frame has been handed to the network.
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// Close the transport.
    async fn close(&self) -> Result<()>;
}

/// An open connection: the send side plus the stream of inbound frame bodies.
///
/// The channel closes when the peer goes away.
pub struct Connection {
    pub transport: Arc<dyn Transport>,
    pub inbound: mpsc::Receiver<Vec<u8>>,
}

impl Connection {
    pub fn new(transport: Arc<dyn Transport>, inbound: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { transport, inbound }
    }

    /// A connection that never receives anything.
    pub fn send_only(transport: Arc<dyn Transport>) -> Self {
        let (_tx, inbound) = mpsc::channel(1);
        Self::new(transport, inbound)
    }
}

/// Opens a fresh [`Connection`] for each connection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection>;
}
