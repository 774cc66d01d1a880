use crate::services::UserService;
use crate::state::gate::ConnectionGate;
use crate::state::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

pub mod connection;
pub mod http;
pub mod sink;

/// Shared state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppCtx {
    pub registry: Arc<Registry>,
    pub gate: Arc<ConnectionGate>,
    pub users: Arc<UserService>,
}

impl AppCtx {
    pub fn new(registry: Arc<Registry>, users: Arc<UserService>, send_timeout: Duration) -> Self {
        let gate = Arc::new(ConnectionGate::new(registry.clone(), send_timeout));
        Self { registry, gate, users }
    }
}
