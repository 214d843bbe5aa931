//! Positional resolver for repeated structures.
//!
//! While a repeated template is being walked, the tracker holds a cursor for
//! it. Resolving a schema reference rewrites it into a concrete store path by
//! appending the current index after every segment that has an active
//! cursor. Cursors are keyed by the resolved ancestor prefix, so
//! `outer[0].inner` and `outer[1].inner` iterate independently.

use std::collections::{HashMap, HashSet};

use crate::schema::path::{self, PATH_DELIMITER};
use crate::schema::template::PropertyReference;

/// Cursor table owned by one top-level walk.
#[derive(Debug, Default)]
pub struct Tracker {
    cursors: HashMap<String, usize>,
    /// Schema keys (indices stripped) of every repeated path seen so far.
    repeated: HashSet<String>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start iterating the repeated path `reference` (already resolved).
    pub fn track(&mut self, reference: &PropertyReference, start: usize) {
        let key = reference.key();
        self.repeated.insert(path::strip_indices(&key));
        self.cursors.insert(key, start);
    }

    /// Advance to the next element.
    ///
    /// # Panics
    /// If `reference` is not tracked.
    pub fn next(&mut self, reference: &PropertyReference) {
        let key = reference.key();
        match self.cursors.get_mut(&key) {
            Some(cursor) => *cursor += 1,
            None => panic!("tracker misuse: next on untracked repeated path '{key}'"),
        }
    }

    /// Stop iterating `reference`.
    pub fn untrack(&mut self, reference: &PropertyReference) {
        self.cursors.remove(&reference.key());
    }

    /// Current index of a tracked path.
    pub fn position(&self, reference: &PropertyReference) -> Option<usize> {
        self.cursors.get(&reference.key()).copied()
    }

    /// Rewrite a schema reference into a concrete store location.
    ///
    /// # Panics
    /// If an ancestor segment of the path is a repeated path this tracker has
    /// seen but has no active cursor at the current resolved prefix.
    pub fn resolve(&self, reference: &PropertyReference) -> PropertyReference {
        if self.repeated.is_empty() || reference.path.is_empty() {
            return reference.clone();
        }

        let mut resolved = path::resource_key(&reference.resource, "");
        let base = resolved.len();
        let mut schema_key = resolved.clone();

        let mut segments = reference.path.split(PATH_DELIMITER).peekable();
        while let Some(segment) = segments.next() {
            if resolved.len() > base {
                resolved.push(PATH_DELIMITER);
                schema_key.push(PATH_DELIMITER);
            }
            resolved.push_str(segment);
            schema_key.push_str(segment);

            let mut cursor = self.cursors.get(&resolved).copied();
            let is_ancestor = segments.peek().is_some();

            if cursor.is_none() && is_ancestor && self.repeated.contains(&schema_key) {
                panic!(
                    "tracker misuse: '{reference}' resolves through repeated '{schema_key}' \
                     without an active cursor at '{resolved}'"
                );
            }

            while let Some(index) = cursor {
                resolved = path::index_path(&resolved, index);
                cursor = self.cursors.get(&resolved).copied();
            }
        }

        PropertyReference::new(
            reference.resource.clone(),
            resolved[base..].to_string(),
        )
    }
}
