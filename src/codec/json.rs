//! JSON codec.
//!
//! Absent required message fields render as `null`, absent optional fields
//! are omitted. Scalars are checked against their template type.

use serde_json::Value as JsonValue;

use crate::codec::render::{render_root, AbsentPolicy};
use crate::codec::{Codec, CodecError};
use crate::refs::Store;
use crate::schema::Property;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn decode(&self, body: &[u8]) -> Result<JsonValue, CodecError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonValue::Null);
        }

        Ok(serde_json::from_slice(body)?)
    }

    fn marshal(&self, property: &Property, store: &Store) -> Result<Vec<u8>, CodecError> {
        let value = render_root(property, store, AbsentPolicy::NullIfRequired)?;
        Ok(serde_json::to_vec(&value.unwrap_or(JsonValue::Null))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Enum, ScalarType, Template};
    use serde_json::json;

    fn output() -> Property {
        let status = Enum::new(
            "status",
            vec![("UNKNOWN".to_string(), 0), ("PENDING".to_string(), 1)],
        )
        .unwrap();

        Property::new(
            "output",
            Template::message(vec![
                Property::new(
                    "id",
                    Template::scalar(ScalarType::Int64).with_reference("input", "id"),
                )
                .required(),
                Property::new(
                    "nickname",
                    Template::scalar(ScalarType::String).with_reference("input", "nickname"),
                ),
                Property::new(
                    "status",
                    Template::enumeration(status).with_reference("input", "status"),
                ),
                Property::new(
                    "tags",
                    Template::repeated(
                        Template::scalar(ScalarType::String).with_reference("input", "tags"),
                    )
                    .with_reference("input", "tags"),
                ),
            ]),
        )
    }

    fn marshal(store: &Store) -> Result<JsonValue, CodecError> {
        let bytes = JsonCodec.marshal(&output(), store)?;
        Ok(serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_marshal_full() {
        let mut store = Store::new();
        store.store_values("input", "", &json!({"id": 7, "nickname": "x", "tags": ["a"]}));
        store.store_enum("input", "status", 1);

        assert_eq!(
            marshal(&store).unwrap(),
            json!({"id": 7, "nickname": "x", "status": "PENDING", "tags": ["a"]})
        );
    }

    #[test]
    fn test_absent_policy() {
        let store = Store::new();
        assert_eq!(marshal(&store).unwrap(), json!({"id": null}));
    }

    #[test]
    fn test_type_mismatch() {
        let mut store = Store::new();
        store.store_value("input", "id", json!("seven"));

        let err = marshal(&store).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { ref path, .. } if path == "id"));
    }

    #[test]
    fn test_decode() {
        assert_eq!(JsonCodec.decode(br#"{"a": [1]}"#).unwrap(), json!({"a": [1]}));
        assert_eq!(JsonCodec.decode(b"  ").unwrap(), JsonValue::Null);
        assert!(matches!(JsonCodec.decode(b"{"), Err(CodecError::Json(_))));
    }
}
