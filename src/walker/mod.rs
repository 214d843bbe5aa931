//! Protocol-neutral value traversal.
//!
//! [`walk`] combines a [`Template`], a [`Store`] and a [`Tracker`] into a
//! [`Value`] tree that every codec renders in its own wire format. Absence is
//! `None` and propagates upward: absent message children are left out, an
//! empty or unbound repeated node is absent as a whole.
//!
//! # Data Flow
//! ```text
//! Template ──► walk ──► Value ──► codec renderer ──► bytes
//!                │
//!      Store ◄───┴───► Tracker (repeated cursors)
//! ```

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::refs::{Reference, Store, Tracker};
use crate::schema::{Enum, PropertyReference, Scalar, Template, TemplateKind};

/// Walked value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Present but empty, e.g. an absent element inside a list.
    Null,
    Scalar(JsonValue),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Plain JSON view without any codec policy applied.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Scalar(value) => value.clone(),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Walk a template against a store.
///
/// The tracker must be fresh for every top-level walk.
pub fn walk(template: &Template, store: &Store, tracker: &mut Tracker) -> Option<Value> {
    match &template.kind {
        TemplateKind::Message(children) => {
            let fields = children
                .iter()
                .filter_map(|(name, property)| {
                    walk(&property.template, store, tracker).map(|value| (name.clone(), value))
                })
                .collect();

            Some(Value::Object(fields))
        }
        TemplateKind::Repeated(element) => {
            walk_repeated(template.reference.as_ref()?, element, store, tracker)
        }
        TemplateKind::Enum(enumeration) => {
            walk_enum(template.reference.as_ref()?, enumeration, store, tracker)
        }
        TemplateKind::Scalar(scalar) => {
            walk_scalar(template.reference.as_ref(), scalar, store, tracker)
        }
    }
}

fn walk_repeated(
    reference: &PropertyReference,
    element: &Template,
    store: &Store,
    tracker: &mut Tracker,
) -> Option<Value> {
    let resolved = tracker.resolve(reference);
    let length = store.length(&resolved.resource, &resolved.path);
    if length == 0 {
        return None;
    }

    let mut items = Vec::with_capacity(length);
    tracker.track(&resolved, 0);

    for _ in 0..length {
        items.push(walk(element, store, tracker).unwrap_or(Value::Null));
        tracker.next(&resolved);
    }

    tracker.untrack(&resolved);
    Some(Value::List(items))
}

fn walk_enum(
    reference: &PropertyReference,
    enumeration: &Enum,
    store: &Store,
    tracker: &mut Tracker,
) -> Option<Value> {
    let resolved = tracker.resolve(reference);
    let ordinal = match store.load(&resolved.resource, &resolved.path)? {
        Reference::Enum(ordinal) => *ordinal,
        // Numeric scalar cells are accepted as raw ordinals.
        Reference::Value(value) => value.as_i64().and_then(|v| i32::try_from(v).ok())?,
    };

    let value = match enumeration.symbol(ordinal) {
        Some(symbol) => JsonValue::from(symbol),
        None => JsonValue::from(ordinal),
    };

    Some(Value::Scalar(value))
}

fn walk_scalar(
    reference: Option<&PropertyReference>,
    scalar: &Scalar,
    store: &Store,
    tracker: &mut Tracker,
) -> Option<Value> {
    match reference {
        Some(reference) => {
            let resolved = tracker.resolve(reference);
            store
                .load(&resolved.resource, &resolved.path)
                .map(|cell| Value::Scalar(cell.to_json()))
        }
        None => scalar.default.clone().map(Value::Scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Enum, Property, ScalarType};
    use serde_json::json;

    fn walk_fresh(template: &Template, store: &Store) -> Option<Value> {
        walk(template, store, &mut Tracker::new())
    }

    fn string_at(path: &str) -> Template {
        Template::scalar(ScalarType::String).with_reference("input", path)
    }

    fn status() -> Enum {
        Enum::new(
            "status",
            vec![("UNKNOWN".to_string(), 0), ("PENDING".to_string(), 1)],
        )
        .unwrap()
    }

    #[test]
    fn test_absent_scalar_and_enum() {
        let store = Store::new();

        assert_eq!(walk_fresh(&string_at("missing"), &store), None);

        let enumeration = Template::enumeration(status()).with_reference("input", "missing");
        assert_eq!(walk_fresh(&enumeration, &store), None);

        let message = Template::message(vec![
            Property::new("a", string_at("missing")),
            Property::new("b", enumeration),
        ]);
        assert_eq!(walk_fresh(&message, &store), Some(Value::Object(BTreeMap::new())));
    }

    #[test]
    fn test_repeated_length_round_trip() {
        let template = Template::repeated(string_at("list")).with_reference("input", "list");

        for n in 0..=5 {
            let items: Vec<_> = (0..n).map(|i| json!(format!("item-{i}"))).collect();
            let mut store = Store::new();
            store.store_values("input", "list", &JsonValue::Array(items.clone()));

            let walked = walk_fresh(&template, &store);
            if n == 0 {
                assert_eq!(walked, None);
                continue;
            }

            let expected = items.into_iter().map(Value::Scalar).collect();
            assert_eq!(walked, Some(Value::List(expected)));
        }
    }

    #[test]
    fn test_repeated_without_reference_is_absent() {
        let template = Template::repeated(string_at("list"));
        let mut store = Store::new();
        store.store_values("input", "list", &json!(["a"]));

        assert_eq!(walk_fresh(&template, &store), None);
    }

    #[test]
    fn test_nested_repeated_independence() {
        let inner = Template::repeated(Template::message(vec![Property::new(
            "value",
            Template::scalar(ScalarType::Int32).with_reference("input", "outer.inner.value"),
        )]))
        .with_reference("input", "outer.inner");

        let template = Template::repeated(Template::message(vec![Property::new("inner", inner)]))
            .with_reference("input", "outer");

        let mut store = Store::new();
        store.store_values(
            "input",
            "",
            &json!({
                "outer": [
                    {"inner": [{"value": 0}, {"value": 1}, {"value": 2}]},
                    {"inner": [{"value": 10}, {"value": 11}]},
                ]
            }),
        );

        let walked = walk_fresh(&template, &store).unwrap().to_json();
        assert_eq!(
            walked,
            json!([
                {"inner": [{"value": 0}, {"value": 1}, {"value": 2}]},
                {"inner": [{"value": 10}, {"value": 11}]},
            ])
        );
    }

    #[test]
    fn test_list_of_lists() {
        let template = Template::repeated(
            Template::repeated(string_at("m")).with_reference("input", "m"),
        )
        .with_reference("input", "m");

        let mut store = Store::new();
        store.store_values("input", "m", &json!([[1, 2, 3], [4]]));

        let walked = walk_fresh(&template, &store).unwrap().to_json();
        assert_eq!(walked, json!([[1, 2, 3], [4]]));
    }

    #[test]
    fn test_absent_elements_become_null() {
        let template = Template::repeated(string_at("list.name")).with_reference("input", "list");

        let mut store = Store::new();
        store.store_value("input", "list[2].name", json!("c"));

        let walked = walk_fresh(&template, &store);
        assert_eq!(
            walked,
            Some(Value::List(vec![
                Value::Null,
                Value::Null,
                Value::Scalar(json!("c")),
            ]))
        );
    }

    #[test]
    fn test_enum_round_trip() {
        let template = Template::enumeration(status()).with_reference("input", "status");

        let mut store = Store::new();
        store.store_enum("input", "status", 1);
        assert_eq!(walk_fresh(&template, &store), Some(Value::Scalar(json!("PENDING"))));

        store.store_enum("input", "status", 42);
        assert_eq!(walk_fresh(&template, &store), Some(Value::Scalar(json!(42))));
    }

    #[test]
    fn test_idempotent_rewalk() {
        let template = Template::message(vec![
            Property::new("name", string_at("name")),
            Property::new(
                "items",
                Template::repeated(string_at("items")).with_reference("input", "items"),
            ),
        ]);

        let mut store = Store::new();
        store.store_values("input", "", &json!({"name": "x", "items": ["a", "b"]}));

        let first = walk(&template, &store, &mut Tracker::new());
        let second = walk(&template, &store, &mut Tracker::new());
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn test_same_list_walked_twice_in_one_walk() {
        let list = Template::repeated(string_at("tags")).with_reference("input", "tags");
        let template = Template::message(vec![
            Property::new("first", list.clone()),
            Property::new("second", list),
        ]);

        let mut store = Store::new();
        store.store_values("input", "tags", &json!(["a", "b"]));

        let walked = walk_fresh(&template, &store).unwrap().to_json();
        assert_eq!(walked, json!({"first": ["a", "b"], "second": ["a", "b"]}));
    }

    #[test]
    fn test_name_and_tags() {
        let template = Template::message(vec![
            Property::new("name", string_at("name").with_default("anon")),
            Property::new(
                "tags",
                Template::repeated(string_at("tags")).with_reference("input", "tags"),
            ),
        ]);

        let mut store = Store::new();
        store.store_values("input", "", &json!({"name": "Ann", "tags": ["a", "b"]}));

        let expected = Value::Object(BTreeMap::from([
            ("name".to_string(), Value::Scalar(json!("Ann"))),
            (
                "tags".to_string(),
                Value::List(vec![Value::Scalar(json!("a")), Value::Scalar(json!("b"))]),
            ),
        ]));
        assert_eq!(walk_fresh(&template, &store), Some(expected));

        let mut store = Store::new();
        store.store_values("input", "", &json!({"tags": ["a", "b"]}));

        let walked = walk_fresh(&template, &store).unwrap();
        let Value::Object(fields) = walked else {
            panic!("expected object");
        };
        assert!(!fields.contains_key("name"));
        assert!(fields.contains_key("tags"));
    }

    #[test]
    fn test_default_without_reference() {
        let template = Template::scalar(ScalarType::String).with_default("anon");
        assert_eq!(walk_fresh(&template, &Store::new()), Some(Value::Scalar(json!("anon"))));
    }
}
