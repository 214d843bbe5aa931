//! `strconcat` function.
//!
//! `strconcat(args...)` joins string literals and referenced strings.
//! Absent references contribute nothing.
//!
//! ```toml
//! [[flows.steps]]
//! name = "label"
//! function = "strconcat"
//! args = ["{{ input:first }}", " ", "{{ input:last }}"]
//! ```

use serde_json::Value as JsonValue;

use crate::codec::json_kind;
use crate::functions::{Argument, Executable, Function, FunctionError};
use crate::refs::Store;

#[derive(Debug, Clone, Copy, Default)]
pub struct Strconcat;

impl Function for Strconcat {
    fn name(&self) -> &'static str {
        "strconcat"
    }

    fn compile(&self, args: Vec<Argument>) -> Result<Box<dyn Executable>, FunctionError> {
        for (position, arg) in args.iter().enumerate() {
            if let Argument::Literal(value) = arg {
                if !value.is_string() {
                    return Err(FunctionError::ArgumentType {
                        function: "strconcat",
                        position,
                        expected: "string",
                        found: json_kind(value),
                    });
                }
            }
        }

        Ok(Box::new(Concat { args }))
    }
}

struct Concat {
    args: Vec<Argument>,
}

impl Executable for Concat {
    fn execute(&self, store: &Store) -> Result<JsonValue, FunctionError> {
        let mut output = String::new();

        for (position, arg) in self.args.iter().enumerate() {
            match arg.resolve(store) {
                Some(JsonValue::String(text)) => output.push_str(&text),
                None | Some(JsonValue::Null) => {}
                Some(other) => {
                    return Err(FunctionError::ArgumentType {
                        function: "strconcat",
                        position,
                        expected: "string",
                        found: json_kind(&other),
                    })
                }
            }
        }

        Ok(JsonValue::String(output))
    }
}
