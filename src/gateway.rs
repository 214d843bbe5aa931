//! Compilation of a validated configuration into the runtime gateway.
//!
//! # Data Flow
//! ```text
//! GatewayConfig
//!     → services (address, codec, timeout)
//!     → flows (schemas compiled, functions compiled, call paths parsed)
//!     → endpoints (method + path pattern → flow + codecs)
//!     → Gateway (immutable, swapped as a whole on reload)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use thiserror::Error;

use crate::codec::{Codec, CodecRegistry};
use crate::config::{FlowConfig, GatewayConfig, StepConfig};
use crate::flow::{CallPath, Flow, Service, ServiceCall, Step, StepAction, UpstreamClient};
use crate::functions::{Argument, FunctionError, FunctionRegistry};
use crate::resilience::RetryPolicy;
use crate::routing::{PathPattern, RouteMatch, Router};
use crate::schema::{compile, Property, SchemaError, TemplateDefinition};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("flow '{flow}' {field} schema: {source}")]
    Schema {
        flow: String,
        field: String,
        #[source]
        source: SchemaError,
    },

    #[error("flow '{flow}' step '{step}': {source}")]
    Function {
        flow: String,
        step: String,
        #[source]
        source: FunctionError,
    },

    #[error("unknown codec '{0}'")]
    UnknownCodec(String),

    #[error("unknown flow '{0}'")]
    UnknownFlow(String),

    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("service '{service}' has invalid address: {source}")]
    InvalidAddress {
        service: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid method '{0}'")]
    InvalidMethod(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("flow '{flow}' step '{step}' sets neither function nor service")]
    EmptyStep { flow: String, step: String },
}

/// Endpoint target.
pub struct Endpoint {
    pub flow: Arc<Flow>,
    pub codec: Arc<dyn Codec>,
    pub response_codec: Arc<dyn Codec>,
}

/// Immutable runtime view of one configuration revision.
pub struct Gateway {
    router: Router<Endpoint>,
    codecs: CodecRegistry,
    client: UpstreamClient,
    max_body_size: usize,
}

impl Gateway {
    /// Compile with the default codec and function registries.
    pub fn compile(config: &GatewayConfig) -> Result<Self, CompileError> {
        Self::compile_with(
            config,
            CodecRegistry::with_defaults(),
            &FunctionRegistry::with_defaults(),
        )
    }

    pub fn compile_with(
        config: &GatewayConfig,
        codecs: CodecRegistry,
        functions: &FunctionRegistry,
    ) -> Result<Self, CompileError> {
        let upstream_timeout = Duration::from_secs(config.timeouts.upstream_secs);

        let mut services = HashMap::new();
        for service in &config.services {
            let codec = lookup_codec(&codecs, &service.codec)?;
            let timeout = service
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(upstream_timeout);
            let compiled = Service::new(&service.name, &service.address, codec, timeout).map_err(
                |source| CompileError::InvalidAddress {
                    service: service.name.clone(),
                    source,
                },
            )?;
            services.insert(service.name.clone(), Arc::new(compiled));
        }

        let mut flows = HashMap::new();
        for flow in &config.flows {
            let compiled = compile_flow(flow, &services, functions)?;
            flows.insert(flow.name.clone(), Arc::new(compiled));
        }

        let mut router = Router::new();
        for endpoint in &config.endpoints {
            let method = parse_method(&endpoint.method)?;
            let pattern = PathPattern::parse(&endpoint.path).map_err(CompileError::InvalidPath)?;
            let flow = flows
                .get(&endpoint.flow)
                .cloned()
                .ok_or_else(|| CompileError::UnknownFlow(endpoint.flow.clone()))?;
            let codec = lookup_codec(&codecs, &endpoint.codec)?;
            let response_codec = match &endpoint.response_codec {
                Some(name) => lookup_codec(&codecs, name)?,
                None => codec.clone(),
            };

            router.add(
                method,
                pattern,
                Endpoint {
                    flow,
                    codec,
                    response_codec,
                },
            );
        }

        let client = UpstreamClient::new(
            Duration::from_secs(config.timeouts.connect_secs),
            RetryPolicy::from_config(&config.retries),
        );

        Ok(Self {
            router,
            codecs,
            client,
            max_body_size: config.security.max_body_size,
        })
    }

    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, Endpoint>> {
        self.router.match_request(method, path)
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn endpoint_count(&self) -> usize {
        self.router.len()
    }
}

fn compile_flow(
    flow: &FlowConfig,
    services: &HashMap<String, Arc<Service>>,
    functions: &FunctionRegistry,
) -> Result<Flow, CompileError> {
    let input = compile_schema(flow, "input", "input", flow.input.as_ref())?;
    let output = compile_schema(flow, "output", "output", flow.output.as_ref())?;

    let steps = flow
        .steps
        .iter()
        .map(|step| compile_step(flow, step, services, functions))
        .collect::<Result<_, _>>()?;

    Ok(Flow {
        name: flow.name.clone(),
        input,
        steps,
        output,
    })
}

fn compile_step(
    flow: &FlowConfig,
    step: &StepConfig,
    services: &HashMap<String, Arc<Service>>,
    functions: &FunctionRegistry,
) -> Result<Step, CompileError> {
    let function_error = |source| CompileError::Function {
        flow: flow.name.clone(),
        step: step.name.clone(),
        source,
    };

    let action = match (&step.function, &step.service) {
        (Some(function), _) => {
            let args = step
                .args
                .iter()
                .cloned()
                .map(Argument::parse)
                .collect::<Result<Vec<_>, _>>()
                .map_err(function_error)?;
            StepAction::Function(functions.compile(function, args).map_err(function_error)?)
        }
        (None, Some(service)) => StepAction::Call(compile_call(
            flow,
            &step.name,
            services,
            CallDefinition {
                service: service.as_str(),
                method: step.method.as_deref(),
                path: step.path.as_deref(),
                request: step.request.as_ref(),
                response: step.response.as_ref(),
            },
        )?),
        (None, None) => {
            return Err(CompileError::EmptyStep {
                flow: flow.name.clone(),
                step: step.name.clone(),
            })
        }
    };

    let rollback = step
        .rollback
        .as_ref()
        .map(|rollback| {
            compile_call(
                flow,
                &format!("{} rollback", step.name),
                services,
                CallDefinition {
                    service: &rollback.service,
                    method: rollback.method.as_deref(),
                    path: rollback.path.as_deref(),
                    request: rollback.request.as_ref(),
                    response: None,
                },
            )
        })
        .transpose()?;

    Ok(Step {
        name: step.name.clone(),
        action,
        rollback,
    })
}

/// Configured parts of a service call.
struct CallDefinition<'a> {
    service: &'a str,
    method: Option<&'a str>,
    path: Option<&'a str>,
    request: Option<&'a TemplateDefinition>,
    response: Option<&'a TemplateDefinition>,
}

fn compile_call(
    flow: &FlowConfig,
    step: &str,
    services: &HashMap<String, Arc<Service>>,
    call: CallDefinition<'_>,
) -> Result<ServiceCall, CompileError> {
    let service = services
        .get(call.service)
        .cloned()
        .ok_or_else(|| CompileError::UnknownService(call.service.to_string()))?;
    let method = match call.method {
        Some(method) => parse_method(method)?,
        None => Method::GET,
    };
    let path = CallPath::parse(call.path.unwrap_or("/")).map_err(|source| CompileError::Schema {
        flow: flow.name.clone(),
        field: format!("step '{step}' path"),
        source,
    })?;
    let request = compile_schema(
        flow,
        &format!("step '{step}' request"),
        "request",
        call.request,
    )?;
    let response = compile_schema(
        flow,
        &format!("step '{step}' response"),
        "response",
        call.response,
    )?;

    Ok(ServiceCall {
        service,
        method,
        path,
        request,
        response,
    })
}

fn compile_schema(
    flow: &FlowConfig,
    field: &str,
    name: &str,
    definition: Option<&TemplateDefinition>,
) -> Result<Option<Property>, CompileError> {
    definition
        .map(|definition| compile(name, definition))
        .transpose()
        .map_err(|source| CompileError::Schema {
            flow: flow.name.clone(),
            field: field.to_string(),
            source,
        })
}

fn lookup_codec(codecs: &CodecRegistry, name: &str) -> Result<Arc<dyn Codec>, CompileError> {
    codecs
        .get(name)
        .ok_or_else(|| CompileError::UnknownCodec(name.to_string()))
}

fn parse_method(method: &str) -> Result<Method, CompileError> {
    method
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| CompileError::InvalidMethod(method.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const CONFIG: &str = r#"
        [[services]]
        name = "users"
        address = "127.0.0.1:9000"

        [[flows]]
        name = "user"

        [[flows.steps]]
        name = "fetch"
        service = "users"
        path = "/users/{{ params:id }}"

        [[flows.steps]]
        name = "greeting"
        function = "sprintf"
        args = ["Hello %s", "{{ fetch:name }}"]

        [flows.output.message.greeting]
        reference = "greeting:result"
        scalar = { type = "string" }

        [[endpoints]]
        flow = "user"
        path = "/users/{id}"
        response_codec = "graphql"
    "#;

    #[test]
    fn test_compile() {
        let config = parse_config(CONFIG).unwrap();
        let gateway = Gateway::compile(&config).unwrap();

        assert_eq!(gateway.endpoint_count(), 1);

        let matched = gateway.route(&Method::GET, "/users/7").unwrap();
        assert_eq!(matched.params["id"], "7");
        assert_eq!(matched.target.flow.name, "user");
        assert_eq!(matched.target.flow.steps.len(), 2);
        assert_eq!(matched.target.codec.name(), "json");
        assert_eq!(matched.target.response_codec.name(), "graphql");

        assert!(gateway.route(&Method::POST, "/users/7").is_none());
    }

    #[test]
    fn test_compile_sample_config() {
        let config = parse_config(include_str!("../demos/gateway.toml")).unwrap();
        let gateway = Gateway::compile(&config).unwrap();
        assert_eq!(gateway.endpoint_count(), 3);
    }

    #[test]
    fn test_compile_response_and_rollback() {
        let config = parse_config(
            r#"
            [[services]]
            name = "orders"
            address = "127.0.0.1:9000"

            [[flows]]
            name = "checkout"

            [[flows.steps]]
            name = "reserve"
            service = "orders"
            method = "post"
            path = "/reserve"

            [flows.steps.response.message.state.enum]
            values = { HELD = 1, RELEASED = 2 }

            [flows.steps.rollback]
            service = "orders"
            method = "delete"
            path = "/reserve/{{ reserve:id }}"

            [[endpoints]]
            flow = "checkout"
            method = "POST"
            path = "/checkout"
            "#,
        )
        .unwrap();

        let gateway = Gateway::compile(&config).unwrap();
        let matched = gateway.route(&Method::POST, "/checkout").unwrap();
        let step = &matched.target.flow.steps[0];

        let StepAction::Call(call) = &step.action else {
            panic!("expected a service call");
        };
        assert_eq!(call.method, Method::POST);
        assert!(call.response.is_some());

        let rollback = step.rollback.as_ref().unwrap();
        assert_eq!(rollback.method, Method::DELETE);
        assert!(rollback.response.is_none());
    }

    #[test]
    fn test_sprintf_arity_fails_compile() {
        let config = parse_config(
            r#"
            [[flows]]
            name = "broken"

            [[flows.steps]]
            name = "format"
            function = "sprintf"
            args = ["%s and %s", "only one"]
            "#,
        )
        .unwrap();

        assert!(matches!(
            Gateway::compile(&config),
            Err(CompileError::Function {
                source: FunctionError::Arity { .. },
                ..
            })
        ));
    }
}
