use serde_json::{Map, Value as JsonValue};

use crate::codec::{check_scalar, walk_root, CodecError};
use crate::refs::Store;
use crate::schema::{Label, Property, Template, TemplateKind};
use crate::walker::Value;

/// How a renderer treats message children the walk left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AbsentPolicy {
    /// Required children render as `null`, optional ones are omitted.
    NullIfRequired,
    /// Absent children are always omitted.
    Omit,
}

/// Walk and render a root property. `None` if the root itself is absent.
pub(crate) fn render_root(
    property: &Property,
    store: &Store,
    policy: AbsentPolicy,
) -> Result<Option<JsonValue>, CodecError> {
    walk_root(property, store)
        .map(|value| render(&property.template, &property.path, value, policy))
        .transpose()
}

pub(crate) fn render(
    template: &Template,
    path: &str,
    value: Value,
    policy: AbsentPolicy,
) -> Result<JsonValue, CodecError> {
    match (&template.kind, value) {
        (_, Value::Null) => Ok(JsonValue::Null),
        (TemplateKind::Message(children), Value::Object(mut fields)) => {
            let mut object = Map::new();

            for (name, property) in children {
                match fields.remove(name) {
                    Some(field) => {
                        let rendered = render(&property.template, &property.path, field, policy)?;
                        object.insert(name.clone(), rendered);
                    }
                    None if policy == AbsentPolicy::NullIfRequired
                        && property.label == Label::Required =>
                    {
                        object.insert(name.clone(), JsonValue::Null);
                    }
                    None => {}
                }
            }

            Ok(JsonValue::Object(object))
        }
        (TemplateKind::Repeated(element), Value::List(items)) => items
            .into_iter()
            .map(|item| render(element, path, item, policy))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        (TemplateKind::Scalar(scalar), Value::Scalar(value)) => {
            check_scalar(scalar.kind, &value, path)?;
            Ok(value)
        }
        (_, value) => Ok(value.to_json()),
    }
}
