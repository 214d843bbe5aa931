//! Binding of decoded input to an input schema.
//!
//! Decoded payloads are stored untyped. Binding walks the schema by shape
//! (message keys and repeated indices below the resource root), converts
//! textual scalars to their declared types and replaces enum symbols with
//! their ordinals.

use serde_json::Value as JsonValue;

use crate::codec::{check_scalar, json_kind, CodecError};
use crate::refs::{Reference, Store};
use crate::schema::path::{index_path, join_path};
use crate::schema::{Enum, Property, Scalar, ScalarType, Template, TemplateKind};

/// Bind the cells of `resource` to the shape of `property`.
pub fn bind(property: &Property, resource: &str, store: &mut Store) -> Result<(), CodecError> {
    bind_template(&property.template, resource, "", store)
}

fn bind_template(
    template: &Template,
    resource: &str,
    path: &str,
    store: &mut Store,
) -> Result<(), CodecError> {
    match &template.kind {
        TemplateKind::Message(children) => {
            for (name, child) in children {
                bind_template(&child.template, resource, &join_path(path, name), store)?;
            }
            Ok(())
        }
        TemplateKind::Repeated(element) => {
            for index in 0..store.length(resource, path) {
                bind_template(element, resource, &index_path(path, index), store)?;
            }
            Ok(())
        }
        TemplateKind::Scalar(scalar) => bind_scalar(scalar, resource, path, store),
        TemplateKind::Enum(enumeration) => bind_enum(enumeration, resource, path, store),
    }
}

fn bind_scalar(
    scalar: &Scalar,
    resource: &str,
    path: &str,
    store: &mut Store,
) -> Result<(), CodecError> {
    let Some(Reference::Value(value)) = store.load(resource, path) else {
        return Ok(());
    };

    match value {
        JsonValue::String(raw) if !matches!(scalar.kind, ScalarType::String | ScalarType::Bytes) => {
            let parsed = scalar
                .kind
                .parse(raw)
                .ok_or_else(|| CodecError::TypeMismatch {
                    path: path.to_string(),
                    expected: scalar.kind.to_string(),
                    found: "string",
                })?;

            store.store_value(resource, path, parsed);
            Ok(())
        }
        value => check_scalar(scalar.kind, value, path),
    }
}

fn bind_enum(
    enumeration: &Enum,
    resource: &str,
    path: &str,
    store: &mut Store,
) -> Result<(), CodecError> {
    let Some(Reference::Value(value)) = store.load(resource, path) else {
        return Ok(());
    };

    let ordinal = match value {
        JsonValue::Null => return Ok(()),
        JsonValue::String(symbol) => {
            enumeration
                .ordinal(symbol)
                .ok_or_else(|| CodecError::UnknownEnumSymbol {
                    path: path.to_string(),
                    symbol: symbol.clone(),
                })?
        }
        JsonValue::Number(number) => number
            .as_i64()
            .and_then(|ordinal| i32::try_from(ordinal).ok())
            .ok_or_else(|| CodecError::TypeMismatch {
                path: path.to_string(),
                expected: "enum".to_string(),
                found: "number",
            })?,
        other => {
            return Err(CodecError::TypeMismatch {
                path: path.to_string(),
                expected: "enum".to_string(),
                found: json_kind(other),
            })
        }
    };

    store.store_enum(resource, path, ordinal);
    Ok(())
}
