//! Conduit server: one HTTP envelope endpoint in front of a registry of named
//! procedures, each family backed by its own in-memory store.

pub mod network;
pub mod service;

pub use network::{Dispatcher, NetworkConfig, NetworkModule};
pub use service::{AppKind, ServerConfig};
