use crate::models::types::ConnId;
use crate::net::sink::websocket;
use crate::net::sink::{ClientSink, ClientSource};
use async_trait::async_trait;
use axum::extract::ws::WebSocket;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Upper bound for delivering a close frame, independent of the send timeout.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Shareable write side of one admitted connection.
///
/// Cloning is cheap; all clones write through the same sink, one writer at a time, so frames
/// from concurrent senders never interleave. A handle obtained from the registry is a snapshot:
/// the connection behind it may already be gone, which surfaces as a send error.
#[derive(Clone)]
pub struct ConnHandle {
    id: ConnId,
    sink: Arc<Mutex<Box<dyn ClientSink>>>,
}

impl ConnHandle {
    pub fn new(sink: Box<dyn ClientSink>) -> Self {
        Self {
            id: ConnId::new(),
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Hands one text frame to the connection, failing if it takes longer than `timeout`.
    pub async fn send(&self, text: String, timeout: Duration) -> anyhow::Result<()> {
        let write = async {
            let mut sink = self.sink.lock().await;
            sink.send_text(text).await
        };

        match tokio::time::timeout(timeout, write).await {
            Ok(res) => res,
            Err(_) => Err(anyhow::Error::msg(format!("send timed out after {timeout:?}"))),
        }
    }

    pub async fn close(&self, code: u16, reason: &str) -> anyhow::Result<()> {
        let close = async {
            let mut sink = self.sink.lock().await;
            sink.close(code, reason).await
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, close).await {
            Ok(res) => res,
            Err(_) => Err(anyhow::Error::msg("close timed out")),
        }
    }
}

impl std::fmt::Debug for ConnHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

/// A raw connection that still has to be turned into a duplex channel.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn upgrade(self) -> anyhow::Result<(Box<dyn ClientSink>, Box<dyn ClientSource>)>;
}

/// Axum completes the HTTP handshake before handing over the socket; splitting cannot fail.
#[async_trait]
impl Transport for WebSocket {
    async fn upgrade(self) -> anyhow::Result<(Box<dyn ClientSink>, Box<dyn ClientSource>)> {
        let (sink, source) = websocket::split(self);
        Ok((Box::new(sink), Box::new(source)))
    }
}
