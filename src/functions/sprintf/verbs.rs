use serde_json::Value as JsonValue;

use crate::codec::json_kind;
use crate::functions::sprintf::scanner::Precision;
use crate::functions::FunctionError;

/// Formatting verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `%s`: string.
    String,
    /// `%q`: double-quoted, escaped string.
    Quoted,
    /// `%d`: integer.
    Int,
    /// `%f`: float, six decimals unless a scale is given.
    Float,
    /// `%v`: any value in its natural form.
    Value,
    /// `%json`: any value as JSON.
    Json,
}

const DEFAULT_FLOAT_SCALE: usize = 6;

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::String,
        Verb::Quoted,
        Verb::Int,
        Verb::Float,
        Verb::Value,
        Verb::Json,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Verb::String => "s",
            Verb::Quoted => "q",
            Verb::Int => "d",
            Verb::Float => "f",
            Verb::Value => "v",
            Verb::Json => "json",
        }
    }

    /// Reject precisions a verb cannot honour.
    pub fn check_precision(&self, precision: Precision) -> Result<(), FunctionError> {
        let scale_allowed = matches!(self, Verb::Float);
        let any_allowed = !matches!(self, Verb::Json);

        if (!any_allowed && precision.is_set()) || (!scale_allowed && precision.scale.is_some()) {
            return Err(FunctionError::InvalidFormat(format!(
                "%{} does not support this precision",
                self.name()
            )));
        }

        Ok(())
    }

    /// Format one argument. Absent values print as empty text (`null` for
    /// `%json`).
    pub fn format(
        &self,
        precision: Precision,
        value: Option<&JsonValue>,
    ) -> Result<String, FunctionError> {
        let text = match (self, value) {
            (Verb::Json, None) => "null".to_string(),
            (Verb::Json, Some(value)) => serde_json::to_string(value)?,
            (_, None | Some(JsonValue::Null)) => String::new(),
            (Verb::String, Some(JsonValue::String(text))) => text.clone(),
            (Verb::Quoted, Some(JsonValue::String(text))) => serde_json::to_string(text)?,
            (Verb::Int, Some(JsonValue::Number(number))) if number.is_i64() || number.is_u64() => {
                number.to_string()
            }
            (Verb::Float, Some(JsonValue::Number(number))) => {
                let scale = precision.scale.unwrap_or(DEFAULT_FLOAT_SCALE);
                format!("{:.*}", scale, number.as_f64().unwrap_or_default())
            }
            (Verb::Value, Some(JsonValue::String(text))) => text.clone(),
            (Verb::Value, Some(value)) => value.to_string(),
            (verb, Some(value)) => {
                return Err(FunctionError::TypeMismatch {
                    verb: verb.name(),
                    expected: verb.expected(),
                    found: json_kind(value),
                })
            }
        };

        Ok(pad(text, precision.width))
    }

    fn expected(&self) -> &'static str {
        match self {
            Verb::String | Verb::Quoted => "string",
            Verb::Int => "integer",
            Verb::Float => "number",
            Verb::Value | Verb::Json => "any",
        }
    }
}

fn pad(text: String, width: Option<usize>) -> String {
    match width {
        Some(width) if text.chars().count() < width => format!("{text:>width$}"),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain(verb: Verb, value: JsonValue) -> Result<String, FunctionError> {
        verb.format(Precision::default(), Some(&value))
    }

    #[test]
    fn test_format_verbs() {
        assert_eq!(plain(Verb::String, json!("Ann")).unwrap(), "Ann");
        assert_eq!(plain(Verb::Quoted, json!("a \"b\"")).unwrap(), r#""a \"b\"""#);
        assert_eq!(plain(Verb::Int, json!(-42)).unwrap(), "-42");
        assert_eq!(plain(Verb::Float, json!(1.5)).unwrap(), "1.500000");
        assert_eq!(plain(Verb::Value, json!(true)).unwrap(), "true");
        assert_eq!(plain(Verb::Json, json!({"a": [1]})).unwrap(), r#"{"a":[1]}"#);
    }

    #[test]
    fn test_format_precision() {
        let scaled = Precision {
            width: None,
            scale: Some(2),
        };
        assert_eq!(Verb::Float.format(scaled, Some(&json!(3.14159))).unwrap(), "3.14");

        let padded = Precision {
            width: Some(5),
            scale: None,
        };
        assert_eq!(Verb::Int.format(padded, Some(&json!(42))).unwrap(), "   42");
    }

    #[test]
    fn test_format_absent() {
        assert_eq!(Verb::String.format(Precision::default(), None).unwrap(), "");
        assert_eq!(Verb::Json.format(Precision::default(), None).unwrap(), "null");
    }

    #[test]
    fn test_type_mismatch() {
        let err = plain(Verb::Int, json!("seven")).unwrap_err();
        assert!(matches!(
            err,
            FunctionError::TypeMismatch {
                verb: "d",
                found: "string",
                ..
            }
        ));

        assert!(plain(Verb::Int, json!(1.5)).is_err());
        assert!(plain(Verb::String, json!(3)).is_err());
    }

    #[test]
    fn test_check_precision() {
        let scale = Precision {
            width: None,
            scale: Some(1),
        };
        let width = Precision {
            width: Some(4),
            scale: None,
        };

        assert!(Verb::Float.check_precision(scale).is_ok());
        assert!(Verb::Int.check_precision(scale).is_err());
        assert!(Verb::Int.check_precision(width).is_ok());
        assert!(Verb::Json.check_precision(width).is_err());
    }
}
