pub mod gate;
pub mod registry;
pub mod session;
