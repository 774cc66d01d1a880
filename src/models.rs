pub mod envelope;
pub mod types;
pub mod user;
