//! HTTP listener: configuration, handlers, middleware, and shutdown control.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::*;
pub use handlers::{AppState, DispatchError, Dispatcher};
pub use module::NetworkModule;
pub use shutdown::*;
