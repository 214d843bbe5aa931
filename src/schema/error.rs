//! Schema construction errors.

use thiserror::Error;

/// A template or property violates a schema invariant.
///
/// Raised while compiling definitions. Never recovered at runtime.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// None of scalar, message, repeated or enum was set.
    #[error("template '{path}' defines no type (expected one of scalar, message, repeated, enum)")]
    NoVariant { path: String },

    /// More than one payload kind was set.
    #[error("template '{path}' defines multiple types: {}", found.join(", "))]
    MultipleVariants {
        path: String,
        found: Vec<&'static str>,
    },

    /// The element template of a repeated node is itself invalid.
    #[error("repeated template '{path}' has an invalid element: {source}")]
    InvalidElement {
        path: String,
        #[source]
        source: Box<SchemaError>,
    },

    /// A message child or property name contains path syntax.
    #[error("invalid identifier '{name}' in '{path}'")]
    InvalidIdentifier { path: String, name: String },

    /// A reference is not of the form `resource:path`.
    #[error("invalid reference '{reference}': expected 'resource:path'")]
    InvalidReference { reference: String },

    /// Two enum symbols share the same ordinal.
    #[error("enum '{name}' maps ordinal {ordinal} to both '{first}' and '{second}'")]
    DuplicateOrdinal {
        name: String,
        ordinal: i32,
        first: String,
        second: String,
    },

    /// One enum symbol is listed twice.
    #[error("enum '{name}' lists symbol '{symbol}' more than once")]
    DuplicateSymbol { name: String, symbol: String },

    /// A static default does not match the scalar type.
    #[error("default value {value} of '{path}' is not a valid {expected}")]
    DefaultMismatch {
        path: String,
        expected: String,
        value: String,
    },

    /// A reference reaches into a repeated path outside of its repeated node.
    #[error("reference '{reference}' in '{path}' points inside repeated '{repeated}' but is not nested in it")]
    DetachedRepeatedReference {
        path: String,
        reference: String,
        repeated: String,
    },
}
