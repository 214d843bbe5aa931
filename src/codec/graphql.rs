//! GraphQL envelope codec.
//!
//! Requests arrive as the standard JSON envelope
//! `{"query": ..., "variables": {...}, "operationName": ...}`; the variables
//! become the decoded input. Responses are `{"data": ...}` with absent keys
//! omitted.

use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};

use crate::codec::render::{render_root, AbsentPolicy};
use crate::codec::{Codec, CodecError};
use crate::refs::Store;
use crate::schema::Property;

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphqlCodec;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    variables: Option<JsonValue>,
    operation_name: Option<String>,
}

impl Codec for GraphqlCodec {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn content_type(&self) -> &'static str {
        "application/graphql-response+json"
    }

    fn accepts(&self, content_type: &str) -> bool {
        matches!(
            content_type,
            "application/json" | "application/graphql+json" | "application/graphql-response+json"
        )
    }

    fn decode(&self, body: &[u8]) -> Result<JsonValue, CodecError> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        tracing::debug!(
            operation = envelope.operation_name.as_deref().unwrap_or("anonymous"),
            "Decoded GraphQL envelope"
        );

        Ok(envelope
            .variables
            .filter(|variables| !variables.is_null())
            .unwrap_or_else(|| JsonValue::Object(Map::new())))
    }

    fn marshal(&self, property: &Property, store: &Store) -> Result<Vec<u8>, CodecError> {
        let data = render_root(property, store, AbsentPolicy::Omit)?;
        Ok(serde_json::to_vec(&json!({ "data": data }))?)
    }
}
