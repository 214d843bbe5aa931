//! Wire codecs.
//!
//! # Responsibilities
//! - Decode request bodies into nested JSON values for the store
//! - Marshal a root property against a store into response bytes
//! - Bind decoded input to a schema ([`bind`])
//!
//! # Design Decisions
//! - Every codec walks with a fresh [`Tracker`]; renderers only differ in
//!   how they treat absent values and how they serialize
//! - Codecs are looked up through an explicit [`CodecRegistry`] value

pub mod bind;
pub mod form;
pub mod graphql;
pub mod json;
mod render;

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::refs::{Store, Tracker};
use crate::schema::path::{index_path, is_identifier, join_path};
use crate::schema::{Property, ScalarType};
use crate::walker::{self, Value};

pub use bind::bind;
pub use form::FormCodec;
pub use graphql::GraphqlCodec;
pub use json::JsonCodec;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed form body: {0}")]
    Form(String),

    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error("unknown symbol '{symbol}' for enum at '{path}'")]
    UnknownEnumSymbol { path: String, symbol: String },

    #[error("invalid key '{key}' at '{path}'")]
    InvalidKey { path: String, key: String },
}

/// Encoder/decoder for one wire format.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Content type of marshalled output.
    fn content_type(&self) -> &'static str;

    /// Whether a request with this content type can be decoded.
    fn accepts(&self, content_type: &str) -> bool {
        content_type == self.content_type()
    }

    fn decode(&self, body: &[u8]) -> Result<JsonValue, CodecError>;

    fn marshal(&self, property: &Property, store: &Store) -> Result<Vec<u8>, CodecError>;
}

/// Codecs available to endpoints and services, keyed by name.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the JSON, form and GraphQL codecs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonCodec));
        registry.register(Arc::new(FormCodec));
        registry.register(Arc::new(GraphqlCodec));
        registry
    }

    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.insert(codec.name().to_string(), codec);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(name).cloned()
    }

    /// Codec for the media type of a `Content-Type` header.
    ///
    /// Parameters such as `charset` are ignored. A codec producing exactly
    /// this media type wins, otherwise the first accepting codec in name
    /// order.
    pub fn for_content_type(&self, header: &str) -> Option<Arc<dyn Codec>> {
        let media_type = media_type(header);

        let mut names: Vec<&String> = self.codecs.keys().collect();
        names.sort();
        let ordered: Vec<&Arc<dyn Codec>> = names
            .into_iter()
            .filter_map(|name| self.codecs.get(name))
            .collect();

        ordered
            .iter()
            .find(|codec| codec.content_type() == media_type)
            .or_else(|| ordered.iter().find(|codec| codec.accepts(&media_type)))
            .copied()
            .cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }
}

/// Media type of a `Content-Type` header, lowercased and without parameters.
pub fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Reject object keys that carry path syntax anywhere in a decoded payload.
pub fn check_keys(value: &JsonValue) -> Result<(), CodecError> {
    check_keys_at(value, "")
}

fn check_keys_at(value: &JsonValue, path: &str) -> Result<(), CodecError> {
    match value {
        JsonValue::Object(fields) => fields.iter().try_for_each(|(key, field)| {
            if !is_identifier(key) {
                return Err(CodecError::InvalidKey {
                    path: path.to_string(),
                    key: key.clone(),
                });
            }
            check_keys_at(field, &join_path(path, key))
        }),
        JsonValue::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| check_keys_at(item, &index_path(path, index))),
        _ => Ok(()),
    }
}

/// Walk a root property with a fresh tracker.
pub(crate) fn walk_root(property: &Property, store: &Store) -> Option<Value> {
    let mut tracker = Tracker::new();
    walker::walk(&property.template, store, &mut tracker)
}

/// JSON type name used in mismatch errors.
pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Check a scalar against its declared type. Bytes must be valid base64.
pub(crate) fn check_scalar(
    kind: ScalarType,
    value: &JsonValue,
    path: &str,
) -> Result<(), CodecError> {
    let valid = match (kind, value) {
        (ScalarType::Bytes, JsonValue::String(encoded)) => base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .is_ok(),
        _ => kind.accepts(value),
    };

    if valid {
        Ok(())
    } else {
        Err(CodecError::TypeMismatch {
            path: path.to_string(),
            expected: kind.to_string(),
            found: json_kind(value),
        })
    }
}
