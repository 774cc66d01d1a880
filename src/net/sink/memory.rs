//! Channel-backed connection halves for exercising sessions without sockets.

use crate::net::connection::Transport;
use crate::net::sink::{ClientSink, ClientSource, Inbound};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(String),
    Close(u16, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Writes {
    Deliver,
    Fail,
    Hang,
}

pub(crate) struct MemorySink {
    tx: mpsc::UnboundedSender<Sent>,
    writes: Writes,
}

#[async_trait]
impl ClientSink for MemorySink {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()> {
        match self.writes {
            Writes::Deliver => self
                .tx
                .send(Sent::Text(text))
                .map_err(|_| anyhow::Error::msg("peer dropped")),
            Writes::Fail => anyhow::bail!("connection reset by peer"),
            Writes::Hang => std::future::pending().await,
        }
    }

    async fn close(&mut self, code: u16, reason: &str) -> anyhow::Result<()> {
        let _ = self.tx.send(Sent::Close(code, reason.to_string()));
        Ok(())
    }
}

pub(crate) struct MemorySource {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

#[async_trait]
impl ClientSource for MemorySource {
    async fn recv(&mut self) -> Inbound {
        self.rx.recv().await.unwrap_or(Inbound::Closed)
    }
}

/// The remote end of an in-memory connection, as seen by a test.
pub(crate) struct Peer {
    inbound: mpsc::UnboundedSender<Inbound>,
    outbound: mpsc::UnboundedReceiver<Sent>,
}

impl Peer {
    pub(crate) fn say(&self, payload: impl AsRef<[u8]>) {
        let _ = self
            .inbound
            .send(Inbound::Payload(Bytes::copy_from_slice(payload.as_ref())));
    }

    pub(crate) fn fail(&self, reason: &str) {
        let _ = self.inbound.send(Inbound::Error(anyhow::Error::msg(reason.to_string())));
    }

    pub(crate) fn hang_up(&self) {
        let _ = self.inbound.send(Inbound::Closed);
    }

    pub(crate) async fn next(&mut self) -> Option<Sent> {
        tokio::time::timeout(Duration::from_secs(1), self.outbound.recv())
            .await
            .ok()
            .flatten()
    }

    /// Returns true if nothing arrives within a short grace period.
    pub(crate) async fn is_quiet(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(50), self.outbound.recv())
            .await
            .is_err()
    }
}

pub(crate) struct MemoryTransport {
    sink: MemorySink,
    source: MemorySource,
    refuse: bool,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn upgrade(self) -> anyhow::Result<(Box<dyn ClientSink>, Box<dyn ClientSource>)> {
        if self.refuse {
            anyhow::bail!("handshake rejected");
        }
        Ok((Box::new(self.sink), Box::new(self.source)))
    }
}

fn build(writes: Writes, refuse: bool) -> (MemoryTransport, Peer) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let transport = MemoryTransport {
        sink: MemorySink { tx: out_tx, writes },
        source: MemorySource { rx: in_rx },
        refuse,
    };
    let peer = Peer {
        inbound: in_tx,
        outbound: out_rx,
    };
    (transport, peer)
}

pub(crate) fn pair() -> (MemoryTransport, Peer) {
    build(Writes::Deliver, false)
}

/// A connection whose writes always fail.
pub(crate) fn broken_pair() -> (MemoryTransport, Peer) {
    build(Writes::Fail, false)
}

/// A connection whose writes never complete, like a peer that stopped reading.
pub(crate) fn stuck_pair() -> (MemoryTransport, Peer) {
    build(Writes::Hang, false)
}

/// A connection whose handshake fails.
pub(crate) fn refusing_pair() -> (MemoryTransport, Peer) {
    build(Writes::Deliver, true)
}

/// Splits a transport into raw halves, skipping the gate.
pub(crate) fn halves(transport: MemoryTransport) -> (MemorySink, MemorySource) {
    (transport.sink, transport.source)
}
