use crate::error::AdmissionError;
use crate::models::types::Username;
use crate::net::connection::{ConnHandle, Transport};
use crate::net::sink::CLOSE_POLICY;
use crate::state::registry::Registry;
use crate::state::session::{SessionWorker, Termination};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Decides whether a connection for a claimed username may join the relay.
///
/// Admission runs in two phases. `check` is a cheap pre-check done before the handshake, so an
/// obviously duplicate client gets a plain conflict response. It can race with another
/// admission for the same name; `admit` relies on the registry's atomic insert for the actual
/// guarantee and drops the loser after its handshake.
pub struct ConnectionGate {
    registry: Arc<Registry>,
    send_timeout: Duration,
}

impl ConnectionGate {
    pub fn new(registry: Arc<Registry>, send_timeout: Duration) -> Self {
        Self { registry, send_timeout }
    }

    pub fn check(&self, claimed: &str) -> Result<Username, AdmissionError> {
        let username = Username::parse(claimed).map_err(|_| AdmissionError::EmptyUsername)?;

        if self.registry.contains(username.as_str()) {
            return Err(AdmissionError::AlreadyConnected);
        }

        Ok(username)
    }

    /// Upgrades `transport`, claims the username and spawns the session that owns the
    /// connection from here on.
    pub async fn admit<T: Transport>(
        &self,
        username: Username,
        transport: T,
    ) -> Result<JoinHandle<Termination>, AdmissionError> {
        let (sink, source) = transport
            .upgrade()
            .await
            .map_err(|e| AdmissionError::UpgradeFailed(e.to_string()))?;

        let handle = ConnHandle::new(sink);
        if let Err(e) = self.registry.register(username.clone(), handle.clone()) {
            tracing::warn!(%username, error = %e, "lost admission race, closing new connection");
            if let Err(e) = handle.close(CLOSE_POLICY, "user already connected").await {
                tracing::debug!(%username, error = %e, "close of rejected connection failed");
            }
            return Err(AdmissionError::AlreadyConnected);
        }

        let worker = SessionWorker::new(username, handle, source, self.registry.clone(), self.send_timeout);
        Ok(tokio::spawn(worker.run()))
    }
}
