//! Flow engine.
//!
//! # Data Flow
//! ```text
//! decoded request ──► Store (input, params, header)
//!     → bind input schema (enum symbols, scalar checks)
//!     → step 1 ─► Store (<step>:result | <step>:...)
//!     → step N
//!     → output codec walks the output schema against the Store
//!
//! step K fails ──► rollback calls of steps K-1 .. 1, newest first
//! ```
//!
//! # Design Decisions
//! - Steps run strictly in order on one `&mut Store`
//! - The first failing step stops the flow; completed steps with a rollback
//!   call are reverted before the error is returned
//! - Rollback failures are logged and do not stop the remaining rollbacks
//! - Function output lands under `<step>:result`, call responses under
//!   `<step>:` directly

pub mod call;
pub mod error;

use std::time::Instant;

use crate::codec::bind;
use crate::functions::Executable;
use crate::observability::metrics;
use crate::refs::Store;
use crate::schema::Property;

pub use call::{CallPath, Service, ServiceCall, UpstreamClient};
pub use error::{FlowError, StepError};

/// Resource path under which a function step stores its output.
pub const FUNCTION_RESULT: &str = "result";

/// Per-execution collaborators.
pub struct ExecutionContext<'a> {
    pub client: &'a UpstreamClient,
    pub request_id: &'a str,
}

pub enum StepAction {
    Function(Box<dyn Executable>),
    Call(ServiceCall),
}

pub struct Step {
    pub name: String,
    pub action: StepAction,
    /// Compensating call made if a later step fails.
    pub rollback: Option<ServiceCall>,
}

impl Step {
    async fn run(&self, store: &mut Store, ctx: &ExecutionContext<'_>) -> Result<(), StepError> {
        match &self.action {
            StepAction::Function(function) => {
                let value = function.execute(store)?;
                store
                    .scoped(&self.name, FUNCTION_RESULT)
                    .store_values("", &value);
                Ok(())
            }
            StepAction::Call(call) => {
                call.execute(&self.name, store, ctx.client, ctx.request_id)
                    .await
            }
        }
    }
}

/// A compiled flow.
pub struct Flow {
    pub name: String,
    pub input: Option<Property>,
    pub steps: Vec<Step>,
    pub output: Option<Property>,
}

impl Flow {
    /// Bind the seeded `input` resource to the input schema, if any.
    pub fn bind_input(&self, store: &mut Store) -> Result<(), FlowError> {
        let Some(input) = &self.input else {
            return Ok(());
        };

        bind(input, "input", store).map_err(|source| FlowError::Input {
            flow: self.name.clone(),
            source,
        })
    }

    pub async fn execute(
        &self,
        store: &mut Store,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), FlowError> {
        let start = Instant::now();

        for (position, step) in self.steps.iter().enumerate() {
            let step_start = Instant::now();
            let result = step.run(store, ctx).await;
            metrics::record_step(&self.name, &step.name, step_start);

            if let Err(source) = result {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    flow = %self.name,
                    step = %step.name,
                    error = %source,
                    "Step failed"
                );
                self.revert(&self.steps[..position], store, ctx).await;
                metrics::record_flow(&self.name, "error", start);

                return Err(FlowError::Step {
                    flow: self.name.clone(),
                    step: step.name.clone(),
                    source,
                });
            }

            tracing::debug!(
                request_id = %ctx.request_id,
                flow = %self.name,
                step = %step.name,
                "Step completed"
            );
        }

        metrics::record_flow(&self.name, "success", start);
        Ok(())
    }

    /// Run the rollback calls of `completed`, newest first.
    async fn revert(&self, completed: &[Step], store: &Store, ctx: &ExecutionContext<'_>) {
        for step in completed.iter().rev() {
            let Some(rollback) = &step.rollback else {
                continue;
            };

            match rollback.dispatch(store, ctx.client, ctx.request_id).await {
                Ok(_) => {
                    metrics::record_rollback(&self.name, &step.name, "success");
                    tracing::info!(
                        request_id = %ctx.request_id,
                        flow = %self.name,
                        step = %step.name,
                        "Step rolled back"
                    );
                }
                Err(e) => {
                    metrics::record_rollback(&self.name, &step.name, "error");
                    tracing::error!(
                        request_id = %ctx.request_id,
                        flow = %self.name,
                        step = %step.name,
                        error = %e,
                        "Rollback failed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{Argument, FunctionRegistry};
    use crate::refs::Reference;
    use crate::resilience::RetryPolicy;
    use crate::schema::{compile, TemplateDefinition};
    use serde_json::json;
    use std::time::Duration;

    fn sprintf(format: &str, args: &[&str]) -> Box<dyn Executable> {
        let mut arguments = vec![Argument::Literal(json!(format))];
        for arg in args {
            arguments.push(Argument::parse(json!(arg)).unwrap());
        }
        FunctionRegistry::with_defaults()
            .compile("sprintf", arguments)
            .unwrap()
    }

    fn client() -> UpstreamClient {
        UpstreamClient::new(Duration::from_secs(1), RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_steps_chain_through_store() {
        let flow = Flow {
            name: "greet".to_string(),
            input: None,
            steps: vec![
                Step {
                    name: "first".to_string(),
                    action: StepAction::Function(sprintf("Hello %s", &["{{ input:name }}"])),
                    rollback: None,
                },
                Step {
                    name: "second".to_string(),
                    action: StepAction::Function(sprintf("%s!", &["{{ first:result }}"])),
                    rollback: None,
                },
            ],
            output: None,
        };

        let mut store = Store::new();
        store.store_value("input", "name", json!("Ann"));

        let client = client();
        let ctx = ExecutionContext {
            client: &client,
            request_id: "test",
        };
        flow.execute(&mut store, &ctx).await.unwrap();

        assert_eq!(
            store.load("second", "result"),
            Some(&Reference::Value(json!("Hello Ann!")))
        );
    }

    #[tokio::test]
    async fn test_failing_step_stops_flow() {
        let flow = Flow {
            name: "count".to_string(),
            input: None,
            steps: vec![
                Step {
                    name: "bad".to_string(),
                    action: StepAction::Function(sprintf("%d", &["{{ input:name }}"])),
                    rollback: None,
                },
                Step {
                    name: "never".to_string(),
                    action: StepAction::Function(sprintf("ran", &[])),
                    rollback: None,
                },
            ],
            output: None,
        };

        let mut store = Store::new();
        store.store_value("input", "name", json!("Ann"));

        let client = client();
        let ctx = ExecutionContext {
            client: &client,
            request_id: "test",
        };
        let err = flow.execute(&mut store, &ctx).await.unwrap_err();

        match &err {
            FlowError::Step { step, .. } => assert_eq!(step, "bad"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.is_upstream());
        assert!(store.load("never", "result").is_none());
    }

    #[test]
    fn test_bind_input() {
        let definition: TemplateDefinition = toml::from_str(
            r#"
            [message.status.enum]
            values = { ACTIVE = 1, BANNED = 2 }
            "#,
        )
        .unwrap();

        let flow = Flow {
            name: "users".to_string(),
            input: Some(compile("input", &definition).unwrap()),
            steps: Vec::new(),
            output: None,
        };

        let mut store = Store::new();
        store.store_value("input", "status", json!("BANNED"));
        flow.bind_input(&mut store).unwrap();
        assert_eq!(store.load("input", "status"), Some(&Reference::Enum(2)));

        store.store_value("input", "status", json!("GONE"));
        assert!(matches!(
            flow.bind_input(&mut store),
            Err(FlowError::Input { .. })
        ));
    }
}
