//! Template and property model.
//!
//! A [`Template`] describes the shape of one value: a scalar leaf, a message
//! of named children, a repeated list sharing one element template, or an
//! enumeration. Any node may be bound to a store location through a
//! [`PropertyReference`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::schema::error::SchemaError;
use crate::schema::path::{self, RESOURCE_DELIMITER};

/// Binding from a template node to a storage location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyReference {
    pub resource: String,
    pub path: String,
}

impl PropertyReference {
    pub fn new(resource: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            path: path.into(),
        }
    }

    /// Store key (`resource:path`).
    pub fn key(&self) -> String {
        path::resource_key(&self.resource, &self.path)
    }
}

impl fmt::Display for PropertyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.resource, RESOURCE_DELIMITER, self.path)
    }
}

impl FromStr for PropertyReference {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemaError::InvalidReference {
            reference: value.to_string(),
        };

        let (resource, path) = value.trim().split_once(RESOURCE_DELIMITER).ok_or_else(invalid)?;
        if !path::is_identifier(resource) {
            return Err(invalid());
        }

        if !path.is_empty() && !path.split('.').all(path::is_identifier) {
            return Err(invalid());
        }

        Ok(Self::new(resource, path))
    }
}

/// Primitive scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    Bool,
    Bytes,
}

impl ScalarType {
    /// Whether a runtime value can be carried by this type without conversion.
    ///
    /// `null` is accepted by every type. Bytes travel base64 encoded.
    pub fn accepts(&self, value: &JsonValue) -> bool {
        match (self, value) {
            (_, JsonValue::Null) => true,
            (ScalarType::String | ScalarType::Bytes, JsonValue::String(_)) => true,
            (ScalarType::Bool, JsonValue::Bool(_)) => true,
            (ScalarType::Int32, JsonValue::Number(n)) => n
                .as_i64()
                .is_some_and(|v| i32::try_from(v).is_ok()),
            (ScalarType::Int64, JsonValue::Number(n)) => n.is_i64(),
            (ScalarType::Uint32, JsonValue::Number(n)) => n
                .as_u64()
                .is_some_and(|v| u32::try_from(v).is_ok()),
            (ScalarType::Uint64, JsonValue::Number(n)) => n.is_u64(),
            (ScalarType::Float | ScalarType::Double, JsonValue::Number(_)) => true,
            _ => false,
        }
    }

    /// Parse a textual value (form fields, path params) into this type.
    pub fn parse(&self, raw: &str) -> Option<JsonValue> {
        match self {
            ScalarType::String | ScalarType::Bytes => Some(JsonValue::String(raw.to_string())),
            ScalarType::Bool => raw.parse::<bool>().ok().map(JsonValue::Bool),
            ScalarType::Int32 => raw.parse::<i32>().ok().map(JsonValue::from),
            ScalarType::Int64 => raw.parse::<i64>().ok().map(JsonValue::from),
            ScalarType::Uint32 => raw.parse::<u32>().ok().map(JsonValue::from),
            ScalarType::Uint64 => raw.parse::<u64>().ok().map(JsonValue::from),
            ScalarType::Float | ScalarType::Double => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::String => "string",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Bool => "bool",
            ScalarType::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// Primitive leaf with an optional static default.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub kind: ScalarType,
    pub default: Option<JsonValue>,
}

/// Enumeration with both lookup directions kept consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub description: Option<String>,
    keys: BTreeMap<String, i32>,
    positions: BTreeMap<i32, String>,
}

impl Enum {
    /// Build an enum from `symbol → ordinal` pairs.
    pub fn new(
        name: impl Into<String>,
        values: impl IntoIterator<Item = (String, i32)>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut keys = BTreeMap::new();
        let mut positions: BTreeMap<i32, String> = BTreeMap::new();

        for (symbol, ordinal) in values {
            if let Some(first) = positions.get(&ordinal) {
                return Err(SchemaError::DuplicateOrdinal {
                    name,
                    ordinal,
                    first: first.clone(),
                    second: symbol,
                });
            }

            if keys.contains_key(&symbol) {
                return Err(SchemaError::DuplicateSymbol { name, symbol });
            }

            positions.insert(ordinal, symbol.clone());
            keys.insert(symbol, ordinal);
        }

        Ok(Self {
            name,
            description: None,
            keys,
            positions,
        })
    }

    /// Encode direction: symbol to ordinal.
    pub fn ordinal(&self, symbol: &str) -> Option<i32> {
        self.keys.get(symbol).copied()
    }

    /// Decode direction: ordinal to symbol.
    pub fn symbol(&self, ordinal: i32) -> Option<&str> {
        self.positions.get(&ordinal).map(String::as_str)
    }

    pub fn keys(&self) -> &BTreeMap<String, i32> {
        &self.keys
    }

    pub fn positions(&self) -> &BTreeMap<i32, String> {
        &self.positions
    }
}

/// Children of a message, keyed by name.
pub type Message = BTreeMap<String, Property>;

/// Payload of a template node. Exactly one kind per node.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateKind {
    Scalar(Scalar),
    Message(Message),
    Repeated(Box<Template>),
    Enum(Enum),
}

/// Discriminant of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Scalar(ScalarType),
    Message,
    Repeated,
    Enum,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(kind) => write!(f, "{kind}"),
            Type::Message => f.write_str("message"),
            Type::Repeated => f.write_str("repeated"),
            Type::Enum => f.write_str("enum"),
        }
    }
}

/// Schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub reference: Option<PropertyReference>,
    pub kind: TemplateKind,
}

impl Template {
    pub fn scalar(kind: ScalarType) -> Self {
        Self::from_kind(TemplateKind::Scalar(Scalar {
            kind,
            default: None,
        }))
    }

    pub fn message(children: impl IntoIterator<Item = Property>) -> Self {
        let children = children
            .into_iter()
            .map(|property| (property.name.clone(), property))
            .collect();

        Self::from_kind(TemplateKind::Message(children))
    }

    pub fn repeated(element: Template) -> Self {
        Self::from_kind(TemplateKind::Repeated(Box::new(element)))
    }

    pub fn enumeration(value: Enum) -> Self {
        Self::from_kind(TemplateKind::Enum(value))
    }

    fn from_kind(kind: TemplateKind) -> Self {
        Self {
            reference: None,
            kind,
        }
    }

    /// Bind this node to a store location.
    pub fn with_reference(mut self, resource: &str, path: &str) -> Self {
        self.reference = Some(PropertyReference::new(resource, path));
        self
    }

    /// Set the static default of a scalar node. Ignored for other kinds.
    pub fn with_default(mut self, value: impl Into<JsonValue>) -> Self {
        if let TemplateKind::Scalar(scalar) = &mut self.kind {
            scalar.default = Some(value.into());
        }
        self
    }

    pub fn kind(&self) -> Type {
        match &self.kind {
            TemplateKind::Scalar(scalar) => Type::Scalar(scalar.kind),
            TemplateKind::Message(_) => Type::Message,
            TemplateKind::Repeated(_) => Type::Repeated,
            TemplateKind::Enum(_) => Type::Enum,
        }
    }

    /// Check that every reference reaching into a repeated path of this tree
    /// is nested inside the repeated node that iterates it.
    pub fn validate_references(&self, path: &str) -> Result<(), SchemaError> {
        let mut repeated = HashSet::new();
        self.collect_repeated(&mut repeated);

        let mut enclosing = Vec::new();
        self.check_references(path, &repeated, &mut enclosing)
    }

    fn collect_repeated(&self, repeated: &mut HashSet<String>) {
        match &self.kind {
            TemplateKind::Message(children) => {
                for child in children.values() {
                    child.template.collect_repeated(repeated);
                }
            }
            TemplateKind::Repeated(element) => {
                if let Some(reference) = &self.reference {
                    repeated.insert(reference.key());
                }
                element.collect_repeated(repeated);
            }
            TemplateKind::Scalar(_) | TemplateKind::Enum(_) => {}
        }
    }

    fn check_references(
        &self,
        location: &str,
        repeated: &HashSet<String>,
        enclosing: &mut Vec<String>,
    ) -> Result<(), SchemaError> {
        if let Some(reference) = &self.reference {
            for ancestor in path::ancestors(&reference.path) {
                let key = path::resource_key(&reference.resource, ancestor);
                if repeated.contains(&key) && !enclosing.contains(&key) {
                    return Err(SchemaError::DetachedRepeatedReference {
                        path: location.to_string(),
                        reference: reference.to_string(),
                        repeated: key,
                    });
                }
            }
        }

        match &self.kind {
            TemplateKind::Message(children) => {
                for child in children.values() {
                    child.template.check_references(&child.path, repeated, enclosing)?;
                }
            }
            TemplateKind::Repeated(element) => {
                let entered = self.reference.as_ref().map(PropertyReference::key);
                if let Some(key) = &entered {
                    enclosing.push(key.clone());
                }

                element.check_references(location, repeated, enclosing)?;

                if entered.is_some() {
                    enclosing.pop();
                }
            }
            TemplateKind::Scalar(_) | TemplateKind::Enum(_) => {}
        }

        Ok(())
    }
}

/// Required/optional label of a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Optional,
    Required,
}

/// Named template inside a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    /// Dotted schema path from the root property.
    pub path: String,
    pub label: Label,
    pub description: Option<String>,
    pub template: Template,
}

impl Property {
    pub fn new(name: impl Into<String>, template: Template) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            label: Label::Optional,
            description: None,
            template,
        }
    }

    pub fn required(mut self) -> Self {
        self.label = Label::Required;
        self
    }

    pub fn kind(&self) -> Type {
        self.template.kind()
    }
}
