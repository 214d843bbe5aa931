//! `application/x-www-form-urlencoded` codec.
//!
//! Keys use the store path syntax: `user.name=Ann&tags[0]=a&tags[1]=b`.
//! Bracketed names (`user[name]`) and appends (`tags[]`) are accepted on
//! decode. Every decoded value is a string; binding to an input schema
//! converts them to the declared scalar types.

use serde_json::{Map, Value as JsonValue};
use url::form_urlencoded;

use crate::codec::render::{render_root, AbsentPolicy};
use crate::codec::{Codec, CodecError};
use crate::refs::Store;
use crate::schema::path::{index_path, join_path};
use crate::schema::Property;

/// Upper bound for explicit indices in decoded keys.
const MAX_INDEX: usize = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
    Append,
}

impl Codec for FormCodec {
    fn name(&self) -> &'static str {
        "form"
    }

    fn content_type(&self) -> &'static str {
        "application/x-www-form-urlencoded"
    }

    fn decode(&self, body: &[u8]) -> Result<JsonValue, CodecError> {
        let mut root = JsonValue::Object(Map::new());

        for (key, value) in form_urlencoded::parse(body) {
            let segments = parse_key(&key)?;
            insert(&mut root, &key, &segments, JsonValue::String(value.into_owned()))?;
        }

        Ok(root)
    }

    fn marshal(&self, property: &Property, store: &Store) -> Result<Vec<u8>, CodecError> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        if let Some(value) = render_root(property, store, AbsentPolicy::Omit)? {
            let mut pairs = Vec::new();
            flatten("", &value, &mut pairs);

            for (key, value) in pairs {
                serializer.append_pair(&key, &value);
            }
        }

        Ok(serializer.finish().into_bytes())
    }
}

fn parse_key(key: &str) -> Result<Vec<Segment>, CodecError> {
    let malformed = || CodecError::Form(format!("malformed key '{key}'"));
    let mut segments = Vec::new();

    for part in key.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(open) => part.split_at(open),
            None => (part, ""),
        };

        if name.is_empty() {
            return Err(malformed());
        }
        segments.push(Segment::Key(name.to_string()));

        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(malformed)?;
            if !rest.starts_with('[') {
                return Err(malformed());
            }

            let inner = &rest[1..close];
            let segment = if inner.is_empty() {
                Segment::Append
            } else if let Ok(index) = inner.parse::<usize>() {
                if index > MAX_INDEX {
                    return Err(CodecError::Form(format!(
                        "index {index} in '{key}' exceeds {MAX_INDEX}"
                    )));
                }
                Segment::Index(index)
            } else {
                Segment::Key(inner.to_string())
            };

            segments.push(segment);
            rest = &rest[close + 1..];
        }
    }

    Ok(segments)
}

fn insert(
    target: &mut JsonValue,
    key: &str,
    segments: &[Segment],
    value: JsonValue,
) -> Result<(), CodecError> {
    let Some((segment, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };

    let conflict = || CodecError::Form(format!("key '{key}' conflicts with an earlier field"));

    match segment {
        Segment::Key(name) => {
            if target.is_null() {
                *target = JsonValue::Object(Map::new());
            }
            let object = target.as_object_mut().ok_or_else(conflict)?;
            let child = object.entry(name.clone()).or_insert(JsonValue::Null);
            insert(child, key, rest, value)
        }
        Segment::Index(index) => {
            if target.is_null() {
                *target = JsonValue::Array(Vec::new());
            }
            let items = target.as_array_mut().ok_or_else(conflict)?;
            if items.len() <= *index {
                items.resize(index + 1, JsonValue::Null);
            }
            insert(&mut items[*index], key, rest, value)
        }
        Segment::Append => {
            if target.is_null() {
                *target = JsonValue::Array(Vec::new());
            }
            let items = target.as_array_mut().ok_or_else(conflict)?;
            if items.len() > MAX_INDEX {
                return Err(CodecError::Form(format!("too many values for '{key}'")));
            }
            items.push(JsonValue::Null);
            let last = items.len() - 1;
            insert(&mut items[last], key, rest, value)
        }
    }
}

fn flatten(path: &str, value: &JsonValue, pairs: &mut Vec<(String, String)>) {
    match value {
        JsonValue::Null => {}
        JsonValue::Object(fields) => {
            for (key, field) in fields {
                flatten(&join_path(path, key), field, pairs);
            }
        }
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(&index_path(path, index), item, pairs);
            }
        }
        JsonValue::String(text) => pairs.push((path.to_string(), text.clone())),
        scalar => pairs.push((path.to_string(), scalar.to_string())),
    }
}
