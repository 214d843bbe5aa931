//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Service call step:
//!     → per-attempt timeout (tokio::time::timeout)
//!     → On failure: retries.rs (check if retryable)
//!     → backoff.rs (exponential delay + jitter) → next attempt
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline
//! - Jittered backoff prevents thundering herd

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
