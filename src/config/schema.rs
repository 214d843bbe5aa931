//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::schema::TemplateDefinition;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for service calls.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    /// Upstream services reachable from flow steps.
    pub services: Vec<ServiceConfig>,

    /// HTTP endpoints exposed by the gateway.
    pub endpoints: Vec<EndpointConfig>,

    /// Flow definitions.
    pub flows: Vec<FlowConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for one gateway request) in seconds.
    pub request_secs: u64,

    /// Default per-attempt timeout for service calls in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request hardening.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Upstream service reachable from flow steps.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier.
    pub name: String,

    /// Service address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Codec used for request bodies and responses.
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Per-attempt timeout override in seconds.
    pub timeout_secs: Option<u64>,
}

/// HTTP endpoint triggering a flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Flow executed for matching requests.
    pub flow: String,

    #[serde(default = "default_method")]
    pub method: String,

    /// Path pattern, `{name}` segments bind path parameters.
    pub path: String,

    /// Codec for request bodies without a recognised content type.
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Codec for the response. Defaults to `codec`.
    pub response_codec: Option<String>,
}

/// Flow definition.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlowConfig {
    pub name: String,

    /// Schema the decoded request input is bound to.
    pub input: Option<TemplateDefinition>,

    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Schema of the response.
    pub output: Option<TemplateDefinition>,
}

/// One flow step: either a function call or a service call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StepConfig {
    /// Step name, also the store resource its results are written to.
    pub name: String,

    /// Function to call.
    pub function: Option<String>,

    /// Function arguments: literals or `{{ resource:path }}` references.
    #[serde(default)]
    pub args: Vec<JsonValue>,

    /// Service to call.
    pub service: Option<String>,

    /// HTTP method of the service call.
    pub method: Option<String>,

    /// Request path of the service call. Whole segments may be references.
    pub path: Option<String>,

    /// Schema of the request body sent to the service.
    pub request: Option<TemplateDefinition>,

    /// Schema the service response is bound to. Enum symbols become
    /// ordinals and textual scalars are converted.
    pub response: Option<TemplateDefinition>,

    /// Compensating call made when a later step of the flow fails.
    pub rollback: Option<RollbackConfig>,
}

/// Compensating service call of a step.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RollbackConfig {
    pub service: String,

    pub method: Option<String>,

    pub path: Option<String>,

    pub request: Option<TemplateDefinition>,
}

fn default_codec() -> String {
    "json".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}
