//! Declarative schema definitions and their compiler.
//!
//! Definitions are the serde form of templates as they appear in the gateway
//! configuration. [`compile`] turns a definition tree into a validated
//! [`Property`], enforcing that every node sets exactly one of `scalar`,
//! `message`, `repeated` or `enum`.
//!
//! ```toml
//! [flows.output.message.name]
//! reference = "input:name"
//! scalar = { type = "string" }
//!
//! [flows.output.message.tags]
//! reference = "input:tags"
//! repeated = { scalar = { type = "string" } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::schema::error::SchemaError;
use crate::schema::path;
use crate::schema::template::{
    Enum, Label, Property, PropertyReference, Scalar, ScalarType, Template, TemplateKind,
};

/// One schema node as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDefinition {
    /// Store location as `resource:path`.
    pub reference: Option<String>,

    #[serde(default)]
    pub label: Label,

    pub description: Option<String>,

    pub scalar: Option<ScalarDefinition>,

    pub message: Option<BTreeMap<String, TemplateDefinition>>,

    pub repeated: Option<Box<TemplateDefinition>>,

    #[serde(rename = "enum")]
    pub enumeration: Option<EnumDefinition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarDefinition {
    #[serde(rename = "type")]
    pub kind: ScalarType,

    pub default: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDefinition {
    pub name: Option<String>,

    /// Symbol to ordinal.
    pub values: BTreeMap<String, i32>,
}

impl TemplateDefinition {
    fn variants(&self) -> Vec<&'static str> {
        let mut found = Vec::new();
        if self.scalar.is_some() {
            found.push("scalar");
        }
        if self.message.is_some() {
            found.push("message");
        }
        if self.repeated.is_some() {
            found.push("repeated");
        }
        if self.enumeration.is_some() {
            found.push("enum");
        }
        found
    }
}

/// Compile a root definition into a property and validate its references.
pub fn compile(name: &str, definition: &TemplateDefinition) -> Result<Property, SchemaError> {
    let property = compile_property(name, name, definition)?;
    property.template.validate_references(&property.path)?;
    Ok(property)
}

fn compile_property(
    name: &str,
    path: &str,
    definition: &TemplateDefinition,
) -> Result<Property, SchemaError> {
    if !path::is_identifier(name) {
        return Err(SchemaError::InvalidIdentifier {
            path: path.to_string(),
            name: name.to_string(),
        });
    }

    Ok(Property {
        name: name.to_string(),
        path: path.to_string(),
        label: definition.label,
        description: definition.description.clone(),
        template: compile_template(path, definition, None)?,
    })
}

fn compile_template(
    path: &str,
    definition: &TemplateDefinition,
    inherited: Option<&PropertyReference>,
) -> Result<Template, SchemaError> {
    let found = definition.variants();
    match found.len() {
        0 => {
            return Err(SchemaError::NoVariant {
                path: path.to_string(),
            })
        }
        1 => {}
        _ => {
            return Err(SchemaError::MultipleVariants {
                path: path.to_string(),
                found,
            })
        }
    }

    let reference = match &definition.reference {
        Some(raw) => Some(raw.parse::<PropertyReference>()?),
        None => None,
    };

    // Leaves and nested lists inside a repeated node read the element cells
    // of the enclosing list unless they name their own location.
    let inherits = definition.message.is_none();
    let reference = match reference {
        Some(reference) => Some(reference),
        None if inherits => inherited.cloned(),
        None => None,
    };

    let kind = if let Some(scalar) = &definition.scalar {
        if let Some(default) = &scalar.default {
            if !scalar.kind.accepts(default) {
                return Err(SchemaError::DefaultMismatch {
                    path: path.to_string(),
                    expected: scalar.kind.to_string(),
                    value: default.to_string(),
                });
            }
        }

        TemplateKind::Scalar(Scalar {
            kind: scalar.kind,
            default: scalar.default.clone(),
        })
    } else if let Some(children) = &definition.message {
        let mut message = BTreeMap::new();
        for (name, child) in children {
            let child_path = path::join_path(path, name);
            message.insert(name.clone(), compile_property(name, &child_path, child)?);
        }
        TemplateKind::Message(message)
    } else if let Some(element) = &definition.repeated {
        let element = compile_template(path, element, reference.as_ref()).map_err(|source| {
            SchemaError::InvalidElement {
                path: path.to_string(),
                source: Box::new(source),
            }
        })?;
        TemplateKind::Repeated(Box::new(element))
    } else if let Some(enumeration) = &definition.enumeration {
        let name = enumeration.name.clone().unwrap_or_else(|| path.to_string());
        let mut value = Enum::new(
            name,
            enumeration
                .values
                .iter()
                .map(|(symbol, ordinal)| (symbol.clone(), *ordinal)),
        )?;
        value.description = definition.description.clone();
        TemplateKind::Enum(value)
    } else {
        return Err(SchemaError::NoVariant {
            path: path.to_string(),
        });
    };

    Ok(Template { reference, kind })
}
