//! `sprintf` function.
//!
//! `sprintf(format, args...)` renders a format string with one argument per
//! verb and returns the resulting string.
//!
//! ```toml
//! [[flows.steps]]
//! name = "greeting"
//! function = "sprintf"
//! args = ["Hello %s, you have %d messages", "{{ input:name }}", "{{ input:count }}"]
//! ```

pub mod scanner;
pub mod verbs;

use serde_json::Value as JsonValue;

use crate::functions::{Argument, Executable, Function, FunctionError};
use crate::refs::Store;

pub use scanner::{Precision, Token, VerbRegistry};
pub use verbs::Verb;

#[derive(Debug, Clone, Default)]
pub struct Sprintf {
    verbs: VerbRegistry,
}

impl Sprintf {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Function for Sprintf {
    fn name(&self) -> &'static str {
        "sprintf"
    }

    fn compile(&self, args: Vec<Argument>) -> Result<Box<dyn Executable>, FunctionError> {
        let mut args = args.into_iter();

        let format = match args.next() {
            Some(Argument::Literal(JsonValue::String(format))) => format,
            Some(_) => {
                return Err(FunctionError::InvalidFormat(
                    "format must be a literal string".to_string(),
                ))
            }
            None => {
                return Err(FunctionError::Arity {
                    function: "sprintf",
                    expected: 1,
                    actual: 0,
                })
            }
        };

        let tokens = self.verbs.scan(&format)?;
        let args: Vec<Argument> = args.collect();

        let mut verbs = 0;
        for token in &tokens {
            if let Token::Verb { verb, precision } = token {
                verb.check_precision(*precision)?;
                verbs += 1;
            }
        }

        if args.len() != verbs {
            return Err(FunctionError::Arity {
                function: "sprintf",
                expected: verbs + 1,
                actual: args.len() + 1,
            });
        }

        Ok(Box::new(Printer { tokens, args }))
    }
}

/// Compiled format with its arguments.
struct Printer {
    tokens: Vec<Token>,
    args: Vec<Argument>,
}

impl Executable for Printer {
    fn execute(&self, store: &Store) -> Result<JsonValue, FunctionError> {
        let mut output = String::new();
        let mut args = self.args.iter();

        for token in &self.tokens {
            match token {
                Token::Constant(text) => output.push_str(text),
                Token::Verb { verb, precision } => {
                    let value = args.next().and_then(|arg| arg.resolve(store));
                    output.push_str(&verb.format(*precision, value.as_ref())?);
                }
            }
        }

        Ok(JsonValue::String(output))
    }
}
