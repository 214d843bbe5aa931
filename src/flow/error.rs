//! Flow execution errors.

use std::time::Duration;

use thiserror::Error;

use crate::codec::CodecError;
use crate::functions::FunctionError;

/// A step failed; the flow stopped at that step.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow '{flow}' failed at step '{step}': {source}")]
    Step {
        flow: String,
        step: String,
        #[source]
        source: StepError,
    },

    #[error("flow '{flow}' input rejected: {source}")]
    Input {
        flow: String,
        #[source]
        source: CodecError,
    },
}

impl FlowError {
    /// Whether the failure was caused by an upstream service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            FlowError::Step {
                source: StepError::Upstream { .. }
                    | StepError::Status { .. }
                    | StepError::Response { .. }
                    | StepError::Timeout { .. },
                ..
            }
        )
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("call path value '{reference}' is missing")]
    MissingPathValue { reference: String },

    #[error("service '{service}' unreachable: {message}")]
    Upstream { service: String, message: String },

    #[error("service '{service}' responded with status {status}")]
    Status { service: String, status: u16 },

    #[error("service '{service}' sent an invalid response: {source}")]
    Response {
        service: String,
        #[source]
        source: CodecError,
    },

    #[error("service '{service}' timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },
}
