//! Protocol-translation gateway library.
//!
//! Requests are decoded by a wire codec into a per-request value store,
//! pushed through a configured flow of function and service-call steps, and
//! rendered back out by walking an output schema against the store.

pub mod codec;
pub mod config;
pub mod flow;
pub mod functions;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod refs;
pub mod resilience;
pub mod routing;
pub mod schema;
pub mod walker;

pub use config::GatewayConfig;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
