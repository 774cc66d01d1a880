use crate::net::sink::{ClientSink, ClientSource, Inbound};
use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

pub struct WebSocketSink {
    ws: SplitSink<WebSocket, Message>,
}

impl WebSocketSink {
    pub fn new(ws: SplitSink<WebSocket, Message>) -> Self {
        Self { ws }
    }
}

#[async_trait]
impl ClientSink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| anyhow::Error::msg(format!("websocket send failed: {e}")))
    }

    async fn close(&mut self, code: u16, reason: &str) -> anyhow::Result<()> {
        let frame = CloseFrame {
            code,
            reason: reason.to_owned().into(),
        };

        self.ws
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| anyhow::Error::msg(format!("websocket close failed: {e}")))
    }
}

pub struct WebSocketSource {
    ws: SplitStream<WebSocket>,
}

impl WebSocketSource {
    pub fn new(ws: SplitStream<WebSocket>) -> Self {
        Self { ws }
    }
}

#[async_trait]
impl ClientSource for WebSocketSource {
    async fn recv(&mut self) -> Inbound {
        loop {
            let msg = match self.ws.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Inbound::Error(anyhow::Error::new(e)),
                None => return Inbound::Closed,
            };

            match msg {
                Message::Text(t) => return Inbound::Payload(Bytes::copy_from_slice(t.as_str().as_bytes())),
                Message::Binary(b) => return Inbound::Payload(b),
                // Axum already answers pings
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return Inbound::Closed,
            }
        }
    }
}

/// Splits an upgraded socket into the two halves a session needs.
pub fn split(socket: WebSocket) -> (WebSocketSink, WebSocketSource) {
    let (write, read) = socket.split();
    (WebSocketSink::new(write), WebSocketSource::new(read))
}
