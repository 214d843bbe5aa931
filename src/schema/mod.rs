//! Protocol-neutral schema model.
//!
//! # Responsibilities
//! - Describe the shape of values with [`Template`] and [`Property`]
//! - Bind template nodes to store locations ([`PropertyReference`])
//! - Compile configuration definitions into validated templates
//!
//! # Design Decisions
//! - `Template` is a closed enum; every traversal is an exhaustive `match`
//! - Message children are a `BTreeMap`, so renderers see them sorted by name
//! - Construction errors are fatal and surface at config load

pub mod definition;
pub mod error;
pub mod path;
pub mod template;

pub use definition::{compile, EnumDefinition, ScalarDefinition, TemplateDefinition};
pub use error::SchemaError;
pub use template::{
    Enum, Label, Message, Property, PropertyReference, Scalar, ScalarType, Template, TemplateKind,
    Type,
};
