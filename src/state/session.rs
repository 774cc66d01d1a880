use crate::error::RouteError;
use crate::models::envelope::ToMessage;
use crate::models::types::{ConnId, Username};
use crate::net::connection::ConnHandle;
use crate::net::sink::{CLOSE_NORMAL, ClientSource, Inbound};
use crate::state::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Why a session stopped. Both are terminal; there is no other state after running.
#[derive(Debug)]
pub enum Termination {
    /// The peer closed the connection
    PeerClosed,
    /// Reading from the connection failed
    ReceiveError(anyhow::Error),
}

/// Forwards envelopes on behalf of one sender.
pub struct MessageRouter {
    sender: Username,
    registry: Arc<Registry>,
    send_timeout: Duration,
}

impl MessageRouter {
    pub fn new(sender: Username, registry: Arc<Registry>, send_timeout: Duration) -> Self {
        Self {
            sender,
            registry,
            send_timeout,
        }
    }

    /// Decodes one inbound payload and hands it to the addressed connection. Returns the
    /// delivered envelope on success.
    pub async fn route(&self, payload: &[u8]) -> Result<ToMessage, RouteError> {
        let msg = ToMessage::decode(payload).map_err(RouteError::Decode)?;

        let Some(recipient) = self.registry.lookup(msg.to.as_str()) else {
            return Err(RouteError::RecipientOffline(msg.to));
        };

        let text = msg.clone().into_delivery(&self.sender).encode().map_err(RouteError::Encode)?;

        recipient
            .send(text, self.send_timeout)
            .await
            .map_err(|e| RouteError::Delivery {
                to: msg.to.clone(),
                reason: e.to_string(),
            })?;

        Ok(msg)
    }

    /// Routes a payload and logs the outcome. Nothing here ends the session.
    async fn dispatch(&self, payload: &[u8]) {
        match self.route(payload).await {
            Ok(msg) => {
                tracing::debug!(from = %self.sender, to = %msg.to, text = %msg.text, "message forwarded");
            }
            Err(e @ RouteError::Decode(_)) => {
                tracing::warn!(from = %self.sender, error = %e, payload = %String::from_utf8_lossy(payload), "dropping message");
            }
            Err(e @ RouteError::RecipientOffline(_)) => {
                tracing::info!(from = %self.sender, error = %e, "dropping message");
            }
            Err(e) => {
                tracing::warn!(from = %self.sender, error = %e, "dropping message");
            }
        }
    }
}

/// Removes the session's registry entry when dropped, whichever way the session ends.
struct Registration {
    registry: Arc<Registry>,
    username: Username,
    id: ConnId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.registry.unregister(self.username.as_str(), self.id) {
            tracing::debug!(username = %self.username, conn = %self.id, "unregistered");
        }
    }
}

/// Owns one admitted connection and runs its receive loop until the connection ends.
pub struct SessionWorker {
    handle: ConnHandle,
    source: Box<dyn ClientSource>,
    router: MessageRouter,
}

impl SessionWorker {
    pub fn new(
        username: Username,
        handle: ConnHandle,
        source: Box<dyn ClientSource>,
        registry: Arc<Registry>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            handle,
            source,
            router: MessageRouter::new(username, registry, send_timeout),
        }
    }

    /// Runs until the peer closes or the read side fails. Messages are handled strictly one at
    /// a time, so one sender's messages reach a recipient in the order they were sent.
    pub async fn run(mut self) -> Termination {
        let username = self.router.sender.clone();
        let registration = Registration {
            registry: self.router.registry.clone(),
            username: username.clone(),
            id: self.handle.id(),
        };
        tracing::info!(%username, conn = %self.handle.id(), "session started");

        let termination = loop {
            match self.source.recv().await {
                Inbound::Payload(payload) => self.router.dispatch(&payload).await,
                Inbound::Closed => break Termination::PeerClosed,
                Inbound::Error(e) => break Termination::ReceiveError(e),
            }
        };

        drop(registration);
        if let Err(e) = self.handle.close(CLOSE_NORMAL, "").await {
            tracing::debug!(%username, error = %e, "close after session end failed");
        }

        match &termination {
            Termination::PeerClosed => tracing::info!(%username, "connection closed"),
            Termination::ReceiveError(e) => tracing::info!(%username, error = %e, "connection lost"),
        }
        termination
    }
}
