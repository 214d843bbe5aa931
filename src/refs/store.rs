//! Per-execution reference store.
//!
//! Cells are keyed by `resource:path`. Repeated indices only appear as
//! bracketed suffixes inside the path, and the number of elements under a
//! repeated path is derived from the indexed keys that were written.
//! Object keys taken from decoded payloads never contribute path syntax.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::schema::path::{index_path, indexed_prefixes, is_identifier, join_path, resource_key};

/// One stored cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// Scalar value. Never an object or array.
    Value(JsonValue),
    /// Enum ordinal.
    Enum(i32),
}

impl Reference {
    /// Scalar view of the cell. Enum cells yield their ordinal.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Reference::Value(value) => value.clone(),
            Reference::Enum(ordinal) => JsonValue::from(*ordinal),
        }
    }
}

/// Flat value store owned by one execution.
#[derive(Debug, Default)]
pub struct Store {
    cells: HashMap<String, Reference>,
    lengths: HashMap<String, usize>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell at a location, if one was written.
    pub fn load(&self, resource: &str, path: &str) -> Option<&Reference> {
        self.cells.get(&resource_key(resource, path))
    }

    /// Set or overwrite a cell.
    pub fn store(&mut self, resource: &str, path: &str, reference: Reference) {
        let key = resource_key(resource, path);

        for (prefix, index) in indexed_prefixes(&key) {
            self.extend_length(prefix, index.saturating_add(1));
        }

        self.cells.insert(key, reference);
    }

    pub fn store_value(&mut self, resource: &str, path: &str, value: JsonValue) {
        self.store(resource, path, Reference::Value(value));
    }

    pub fn store_enum(&mut self, resource: &str, path: &str, ordinal: i32) {
        self.store(resource, path, Reference::Enum(ordinal));
    }

    /// Decompose a nested value into scalar cells below `prefix`.
    ///
    /// Objects descend by key and arrays by index. An empty array or object
    /// stores nothing. Keys that are not plain identifiers (`a.b`, `a[3]`)
    /// are skipped.
    pub fn store_values(&mut self, resource: &str, prefix: &str, value: &JsonValue) {
        match value {
            JsonValue::Object(fields) => {
                for (key, field) in fields.iter().filter(|(key, _)| is_identifier(key)) {
                    self.store_values(resource, &join_path(prefix, key), field);
                }
            }
            JsonValue::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.store_values(resource, &index_path(prefix, index), item);
                }

                // Elements that were themselves empty containers wrote no
                // cells but still count towards the length.
                if !items.is_empty() {
                    self.extend_length(&resource_key(resource, prefix), items.len());
                }
            }
            scalar => self.store_value(resource, prefix, scalar.clone()),
        }
    }

    /// Number of elements under a repeated path, `0` if none were written.
    pub fn length(&self, resource: &str, path: &str) -> usize {
        self.lengths
            .get(&resource_key(resource, path))
            .copied()
            .unwrap_or(0)
    }

    /// Drop every cell and length.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.lengths.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// View that confines reads and writes to one resource and path prefix.
    pub fn scoped<'a>(&'a mut self, resource: &'a str, prefix: &'a str) -> PrefixStore<'a> {
        PrefixStore {
            store: self,
            resource,
            prefix,
        }
    }

    fn extend_length(&mut self, key: &str, length: usize) {
        let entry = self.lengths.entry(key.to_string()).or_insert(0);
        *entry = (*entry).max(length);
    }
}

/// Store view with a fixed resource and path prefix.
pub struct PrefixStore<'a> {
    store: &'a mut Store,
    resource: &'a str,
    prefix: &'a str,
}

impl PrefixStore<'_> {
    pub fn load(&self, path: &str) -> Option<&Reference> {
        self.store.load(self.resource, &join_path(self.prefix, path))
    }

    pub fn store_value(&mut self, path: &str, value: JsonValue) {
        let path = join_path(self.prefix, path);
        self.store.store_value(self.resource, &path, value);
    }

    pub fn store_enum(&mut self, path: &str, ordinal: i32) {
        let path = join_path(self.prefix, path);
        self.store.store_enum(self.resource, &path, ordinal);
    }

    pub fn store_values(&mut self, path: &str, value: &JsonValue) {
        let path = join_path(self.prefix, path);
        self.store.store_values(self.resource, &path, value);
    }
}
