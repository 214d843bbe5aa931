//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment matching, parameter capture)
//!     → Return: matched endpoint + params, or NoMatch
//!
//! Route Compilation (at config load):
//!     EndpointConfig[]
//!     → Parse path patterns
//!     → Sort by specificity
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load, immutable at runtime
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::PathPattern;
pub use router::{RouteMatch, Router};
