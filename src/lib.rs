pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod net;
pub mod services;
pub mod state;

// Convenient re-exports (so call sites can do `wsrelay::Registry`, etc.)
pub use net::AppCtx;
pub use state::{
    gate::ConnectionGate,
    registry::Registry,
    session::{SessionWorker, Termination},
};
