//! Reusable stores.
//!
//! Executions borrow a [`Store`] from the pool and give it back on drop. A
//! returned store is cleared before it becomes available again.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use crate::refs::store::Store;

/// Pool of idle stores shared by all executions.
#[derive(Debug, Default)]
pub struct StorePool {
    idle: Mutex<Vec<Store>>,
    max_idle: usize,
}

impl StorePool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take an idle store or create a fresh one.
    pub fn acquire(self: &Arc<Self>) -> PooledStore {
        let store = self
            .idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop())
            .unwrap_or_default();

        PooledStore {
            store: Some(store),
            pool: Arc::clone(self),
        }
    }

    /// Number of stores waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    fn release(&self, mut store: Store) {
        store.clear();

        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(store);
            }
        }
    }
}

/// Store on loan from a [`StorePool`].
pub struct PooledStore {
    store: Option<Store>,
    pool: Arc<StorePool>,
}

impl Deref for PooledStore {
    type Target = Store;

    fn deref(&self) -> &Store {
        // Only taken in drop.
        self.store.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledStore {
    fn deref_mut(&mut self) -> &mut Store {
        self.store.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledStore {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            self.pool.release(store);
        }
    }
}
