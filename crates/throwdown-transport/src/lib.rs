//! Transport abstraction layer for Throwdown.
//!
//! Provides the [`Transport`] and [`Connection`] traits so the game layers
//! never touch sockets directly. The only implementation today is
//! WebSocket, which also answers plain HTTP health checks on the same port.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport served by `axum`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{HEALTH_RESPONSE, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Process-wide handle for one accepted socket.
///
/// Players never log in, so this is also how rooms and the matchmaking
/// queue tell participants apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listener side: hands out upgraded connections one at a time.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next client that finished its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops taking new clients; live connections keep running.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One client socket carrying whole message payloads.
///
/// A handler parks a reader in `recv` while a writer task calls `send`
/// on the same connection, so both take `&self`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, payload: &[u8]) -> Result<(), Self::Error>;

    /// Next text or binary payload. `Ok(None)` once the peer has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
