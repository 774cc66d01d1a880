pub mod websocket;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use bytes::Bytes;

/// Normal closure, sent when a session ends.
pub const CLOSE_NORMAL: u16 = 1000;
/// The server is going away.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Policy violation, sent to a connection that lost the admission race.
pub const CLOSE_POLICY: u16 = 1008;

/// Write side of a client connection. Shared between sessions through a `ConnHandle`.
#[async_trait]
pub trait ClientSink: Send {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()>;
    async fn close(&mut self, code: u16, reason: &str) -> anyhow::Result<()>;
}

/// One step of the read side of a client connection.
#[derive(Debug)]
pub enum Inbound {
    /// A discrete message from the peer
    Payload(Bytes),
    /// The peer closed the connection
    Closed,
    /// Anything else that ends the stream
    Error(anyhow::Error),
}

/// Read side of a client connection. Owned by exactly one session.
#[async_trait]
pub trait ClientSource: Send {
    async fn recv(&mut self) -> Inbound;
}
