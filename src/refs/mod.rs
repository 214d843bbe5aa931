//! Runtime value storage.
//!
//! # Responsibilities
//! - Hold decoded and computed values for one execution ([`Store`])
//! - Resolve schema references to indexed store paths ([`Tracker`])
//! - Recycle stores across executions ([`StorePool`])
//!
//! # Design Decisions
//! - Mutation needs `&mut Store`; one execution owns its store, no locking
//! - Repeated lengths are derived from indexed writes, never stored directly

pub mod pool;
pub mod store;
pub mod tracker;

pub use pool::{PooledStore, StorePool};
pub use store::{PrefixStore, Reference, Store};
pub use tracker::Tracker;
