//! Function plugins.
//!
//! # Responsibilities
//! - Compile a function call from configured arguments ([`Function`])
//! - Evaluate the compiled call against a store ([`Executable`])
//! - Expose the available functions through a [`FunctionRegistry`]
//!
//! # Design Decisions
//! - Argument validation (arity, format syntax) happens at config compile
//!   time; only value types are checked per execution
//! - Arguments are literals or `{{ resource:path }}` store references

pub mod sprintf;
pub mod strconcat;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::refs::{Reference, Store};
use crate::schema::{PropertyReference, SchemaError};

pub use sprintf::Sprintf;
pub use strconcat::Strconcat;

#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("unknown function '{0}'")]
    Unknown(String),

    #[error("{function}: expected {expected} arguments, got {actual}")]
    Arity {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("invalid argument reference: {0}")]
    InvalidReference(#[from] SchemaError),

    #[error("%{verb} cannot format {found} (expected {expected})")]
    TypeMismatch {
        verb: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{function}: argument {position} must be a {expected}, found {found}")]
    ArgumentType {
        function: &'static str,
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to encode argument: {0}")]
    Json(#[from] serde_json::Error),
}

/// Function argument as configured.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(JsonValue),
    Reference(PropertyReference),
}

impl Argument {
    /// Parse a configured value. Strings of the form `{{ resource:path }}`
    /// become references.
    pub fn parse(value: JsonValue) -> Result<Self, FunctionError> {
        if let JsonValue::String(text) = &value {
            let trimmed = text.trim();
            if let Some(inner) = trimmed
                .strip_prefix("{{")
                .and_then(|rest| rest.strip_suffix("}}"))
            {
                return Ok(Argument::Reference(inner.trim().parse()?));
            }
        }

        Ok(Argument::Literal(value))
    }

    /// Current value of the argument. `None` if the referenced cell is absent.
    pub fn resolve(&self, store: &Store) -> Option<JsonValue> {
        match self {
            Argument::Literal(value) => Some(value.clone()),
            Argument::Reference(reference) => store
                .load(&reference.resource, &reference.path)
                .map(Reference::to_json),
        }
    }
}

/// A compiled function call.
pub trait Executable: Send + Sync {
    fn execute(&self, store: &Store) -> Result<JsonValue, FunctionError>;
}

/// A named function plugin.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;

    fn compile(&self, args: Vec<Argument>) -> Result<Box<dyn Executable>, FunctionError>;
}

/// Functions available to flow steps.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Sprintf::new()));
        registry.register(Arc::new(Strconcat));
        registry
    }

    pub fn register(&mut self, function: Arc<dyn Function>) {
        self.functions.insert(function.name().to_string(), function);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    /// Look up `name` and compile a call with `args`.
    pub fn compile(
        &self,
        name: &str,
        args: Vec<Argument>,
    ) -> Result<Box<dyn Executable>, FunctionError> {
        let function = self
            .get(name)
            .ok_or_else(|| FunctionError::Unknown(name.to_string()))?;
        function.compile(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_argument_parse() {
        assert_eq!(
            Argument::parse(json!("{{ input:user.name }}")).unwrap(),
            Argument::Reference(PropertyReference::new("input", "user.name"))
        );
        assert_eq!(
            Argument::parse(json!("plain")).unwrap(),
            Argument::Literal(json!("plain"))
        );
        assert_eq!(Argument::parse(json!(3)).unwrap(), Argument::Literal(json!(3)));
        assert!(Argument::parse(json!("{{ nope }}")).is_err());
    }

    #[test]
    fn test_argument_resolve() {
        let mut store = Store::new();
        store.store_value("input", "name", json!("Ann"));
        store.store_enum("input", "status", 2);

        let name = Argument::parse(json!("{{ input:name }}")).unwrap();
        let status = Argument::parse(json!("{{ input:status }}")).unwrap();
        let missing = Argument::parse(json!("{{ input:missing }}")).unwrap();

        assert_eq!(name.resolve(&store), Some(json!("Ann")));
        assert_eq!(status.resolve(&store), Some(json!(2)));
        assert_eq!(missing.resolve(&store), None);
    }

    #[test]
    fn test_registry_unknown() {
        let registry = FunctionRegistry::with_defaults();
        assert!(registry.get("sprintf").is_some());
        assert!(registry.get("strconcat").is_some());
        assert!(matches!(
            registry.compile("upper", vec![]),
            Err(FunctionError::Unknown(_))
        ));
    }
}
