//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (endpoints reference existing flows, steps
//!   reference existing services and functions)
//! - Validate value ranges (timeouts > 0, retry bounds)
//! - Compile every schema definition so schema errors surface at load
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::codec::CodecRegistry;
use crate::config::schema::{FlowConfig, GatewayConfig};
use crate::flow::CallPath;
use crate::functions::FunctionRegistry;
use crate::routing::PathPattern;
use crate::schema::{self, path, SchemaError, TemplateDefinition};

/// Resources the gateway seeds for every request; steps cannot reuse them.
pub const RESERVED_RESOURCES: [&str; 3] = ["input", "params", "header"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("{owner} references unknown {kind} '{name}'")]
    UnknownReference {
        owner: String,
        kind: &'static str,
        name: String,
    },

    #[error("flow '{flow}' step '{step}': {message}")]
    InvalidStep {
        flow: String,
        step: String,
        message: String,
    },

    #[error("flow '{flow}' {field} schema: {source}")]
    Schema {
        flow: String,
        field: String,
        #[source]
        source: SchemaError,
    },
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let codecs = CodecRegistry::with_defaults();
    let functions = FunctionRegistry::with_defaults();

    validate_settings(config, &mut errors);

    let mut services = HashSet::new();
    for service in &config.services {
        if !services.insert(service.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "service",
                name: service.name.clone(),
            });
        }

        if service.address.trim().is_empty() {
            errors.push(invalid(
                format!("services.{}.address", service.name),
                "must not be empty",
            ));
        }

        if codecs.get(&service.codec).is_none() {
            errors.push(unknown(format!("service '{}'", service.name), "codec", &service.codec));
        }
    }

    let mut flows = HashSet::new();
    for flow in &config.flows {
        if !flows.insert(flow.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "flow",
                name: flow.name.clone(),
            });
        }

        validate_flow(flow, &services, &functions, &mut errors);
    }

    let mut routes = HashSet::new();
    for endpoint in &config.endpoints {
        let owner = format!("endpoint '{} {}'", endpoint.method, endpoint.path);

        if endpoint.method.parse::<Method>().is_err() {
            errors.push(invalid(format!("{owner} method"), "not an HTTP method"));
        }

        if let Err(message) = PathPattern::parse(&endpoint.path) {
            errors.push(invalid(format!("{owner} path"), &message));
        }

        if !routes.insert((endpoint.method.to_ascii_uppercase(), endpoint.path.as_str())) {
            errors.push(ValidationError::Duplicate {
                kind: "endpoint",
                name: format!("{} {}", endpoint.method, endpoint.path),
            });
        }

        if !flows.contains(endpoint.flow.as_str()) {
            errors.push(unknown(owner.clone(), "flow", &endpoint.flow));
        }

        for codec in std::iter::once(&endpoint.codec).chain(endpoint.response_codec.as_ref()) {
            if codecs.get(codec).is_none() {
                errors.push(unknown(owner.clone(), "codec", codec));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_settings(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(invalid("listener.bind_address", "not a socket address"));
    }

    if config.listener.max_connections == 0 {
        errors.push(invalid("listener.max_connections", "must be > 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(invalid("timeouts.request_secs", "must be > 0"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(invalid("timeouts.connect_secs", "must be > 0"));
    }

    if config.timeouts.upstream_secs == 0 {
        errors.push(invalid("timeouts.upstream_secs", "must be > 0"));
    }

    let retries = &config.retries;
    if retries.enabled && retries.max_attempts == 0 {
        errors.push(invalid("retries.max_attempts", "must be > 0"));
    }

    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(invalid(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(invalid("security.max_body_size", "must be > 0"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(invalid("observability.metrics_address", "not a socket address"));
    }
}

fn validate_flow(
    flow: &FlowConfig,
    services: &HashSet<&str>,
    functions: &FunctionRegistry,
    errors: &mut Vec<ValidationError>,
) {
    validate_schema(flow, "input", "input", flow.input.as_ref(), errors);
    validate_schema(flow, "output", "output", flow.output.as_ref(), errors);

    let mut steps = HashSet::new();
    for step in &flow.steps {
        let step_error = |message: String| ValidationError::InvalidStep {
            flow: flow.name.clone(),
            step: step.name.clone(),
            message,
        };

        if !path::is_identifier(&step.name) {
            errors.push(step_error("name must be a plain identifier".to_string()));
        }

        if RESERVED_RESOURCES.contains(&step.name.as_str()) {
            errors.push(step_error(format!("name '{}' is reserved", step.name)));
        }

        if !steps.insert(step.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "step",
                name: format!("{}.{}", flow.name, step.name),
            });
        }

        match (&step.function, &step.service) {
            (Some(function), None) => {
                if functions.get(function).is_none() {
                    errors.push(unknown(
                        format!("flow '{}' step '{}'", flow.name, step.name),
                        "function",
                        function,
                    ));
                }
            }
            (None, Some(service)) => {
                validate_call(step.method.as_deref(), step.path.as_deref(), &step_error, errors);
                if !services.contains(service.as_str()) {
                    errors.push(unknown(
                        format!("flow '{}' step '{}'", flow.name, step.name),
                        "service",
                        service,
                    ));
                }

                validate_schema(
                    flow,
                    &format!("step '{}' request", step.name),
                    "request",
                    step.request.as_ref(),
                    errors,
                );
                validate_schema(
                    flow,
                    &format!("step '{}' response", step.name),
                    "response",
                    step.response.as_ref(),
                    errors,
                );
            }
            (Some(_), Some(_)) => {
                errors.push(step_error("sets both function and service".to_string()))
            }
            (None, None) => errors.push(step_error("sets neither function nor service".to_string())),
        }

        if step.function.is_some() && step.response.is_some() {
            errors.push(step_error("response schemas only apply to service calls".to_string()));
        }

        if let Some(rollback) = &step.rollback {
            let rollback_error = |message: String| step_error(format!("rollback {message}"));
            validate_call(
                rollback.method.as_deref(),
                rollback.path.as_deref(),
                &rollback_error,
                errors,
            );
            if !services.contains(rollback.service.as_str()) {
                errors.push(unknown(
                    format!("flow '{}' step '{}' rollback", flow.name, step.name),
                    "service",
                    &rollback.service,
                ));
            }

            validate_schema(
                flow,
                &format!("step '{}' rollback request", step.name),
                "request",
                rollback.request.as_ref(),
                errors,
            );
        }
    }
}

fn validate_call(
    method: Option<&str>,
    path: Option<&str>,
    step_error: &impl Fn(String) -> ValidationError,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(method) = method {
        if method.parse::<Method>().is_err() {
            errors.push(step_error(format!("invalid method '{method}'")));
        }
    }

    match path {
        Some(path) if path.starts_with('/') => {
            if let Err(e) = CallPath::parse(path) {
                errors.push(step_error(format!("path '{path}': {e}")));
            }
        }
        Some(path) => errors.push(step_error(format!("path '{path}' must start with '/'"))),
        None => errors.push(step_error("service calls need a path".to_string())),
    }
}

fn validate_schema(
    flow: &FlowConfig,
    field: &str,
    name: &str,
    definition: Option<&TemplateDefinition>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(definition) = definition else {
        return;
    };

    if let Err(source) = schema::compile(name, definition) {
        errors.push(ValidationError::Schema {
            flow: flow.name.clone(),
            field: field.to_string(),
            source,
        });
    }
}

fn invalid(field: impl Into<String>, message: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        message: message.to_string(),
    }
}

fn unknown(owner: String, kind: &'static str, name: &str) -> ValidationError {
    ValidationError::UnknownReference {
        owner,
        kind,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> GatewayConfig {
        toml::from_str(source).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r#"
            [[endpoints]]
            flow = "echo"
            path = "/echo"

            [[flows]]
            name = "echo"

            [flows.output.message.name]
            reference = "input:name"
            scalar = { type = "string" }
            "#,
        );

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = parse(
            r#"
            [listener]
            bind_address = "not-an-address"

            [timeouts]
            request_secs = 0

            [[endpoints]]
            flow = "missing"
            method = "NOT A METHOD"
            path = "no-slash"
            codec = "xml"

            [[flows]]
            name = "broken"

            [flows.output]
            scalar = { type = "string" }
            repeated = { scalar = { type = "string" } }

            [[flows.steps]]
            name = "input"
            function = "sprintf"

            [[flows.steps]]
            name = "call"
            service = "nowhere"
            "#,
        );

        let errors = validate_config(&config).unwrap_err();
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();

        assert!(messages.iter().any(|m| m.contains("listener.bind_address")));
        assert!(messages.iter().any(|m| m.contains("timeouts.request_secs")));
        assert!(messages.iter().any(|m| m.contains("unknown flow 'missing'")));
        assert!(messages.iter().any(|m| m.contains("unknown codec 'xml'")));
        assert!(messages.iter().any(|m| m.contains("is reserved")));
        assert!(messages.iter().any(|m| m.contains("unknown service 'nowhere'")));
        assert!(messages.iter().any(|m| m.contains("needs a path")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::Schema { source: SchemaError::MultipleVariants { .. }, .. })));
        assert!(errors.len() >= 9);
    }

    #[test]
    fn test_rollback_and_response() {
        let config = parse(
            r#"
            [[services]]
            name = "orders"
            address = "127.0.0.1:9000"

            [[flows]]
            name = "checkout"

            [[flows.steps]]
            name = "reserve"
            service = "orders"
            path = "/reserve"

            [flows.steps.response.message.state.enum]
            values = { OPEN = 1, OPEN_AGAIN = 1 }

            [flows.steps.rollback]
            service = "billing"
            path = "release"

            [[flows.steps]]
            name = "note"
            function = "strconcat"
            args = ["a", "b"]

            [flows.steps.response]
            scalar = { type = "string" }
            "#,
        );

        let errors = validate_config(&config).unwrap_err();
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();

        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::Schema { source: SchemaError::DuplicateOrdinal { .. }, .. }
        )));
        assert!(messages.iter().any(|m| m.contains("unknown service 'billing'")));
        assert!(messages.iter().any(|m| m.contains("rollback path 'release'")));
        assert!(messages.iter().any(|m| m.contains("only apply to service calls")));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_duplicate_endpoint() {
        let config = parse(
            r#"
            [[endpoints]]
            flow = "a"
            path = "/a"

            [[endpoints]]
            flow = "a"
            method = "get"
            path = "/a"

            [[flows]]
            name = "a"
            "#,
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::Duplicate { kind: "endpoint", .. }]
        ));
    }
}
