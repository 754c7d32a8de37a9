//! Proxy integration
//!
//! Request context and the handler a passthrough proxy calls to log
//! upstream traffic.

pub mod handler;
pub mod logging;

pub use handler::{PassthroughLoggingHandler, PassthroughResult};
pub use logging::RequestContext;
