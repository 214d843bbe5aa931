//! Retry policy for upstream service calls.
//!
//! # Design Decisions
//! - Connection errors and timeouts are always retryable
//! - Only 502, 503 and 504 responses are retried; other statuses are
//!   returned to the flow as-is
//! - Every step call is retried the same way regardless of HTTP method,
//!   since flows declare their calls explicitly

use std::time::Duration;

use axum::http::StatusCode;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        if !config.enabled {
            return Self::none();
        }

        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// Whether another attempt may follow `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32, status: Option<StatusCode>) -> bool {
        attempt < self.max_attempts && is_retryable(status)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

/// `None` stands for a connection error or timeout.
pub fn is_retryable(status: Option<StatusCode>) -> bool {
    match status {
        None => true,
        Some(status) => matches!(
            status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ),
    }
}
