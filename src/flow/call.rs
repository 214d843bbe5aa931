//! Service call steps.
//!
//! # Responsibilities
//! - Render the request path from literals and store references
//! - Marshal the request body with the service codec
//! - Send the request with a per-attempt deadline, retrying with backoff
//! - Decode the response into the step's store resource and bind it to the
//!   response schema
//!
//! # Data Flow
//! ```text
//! Store ──► request schema ──► codec.marshal ──► hyper client ──► service
//!                                                    │ 502/503/504, errors:
//!                                                    │ backoff + retry
//!                                                    │
//! Store ◄── bind(response) ◄── store_values(step) ◄── codec.decode
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::codec::{bind, Codec};
use crate::flow::error::StepError;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::refs::{Reference, Store};
use crate::resilience::RetryPolicy;
use crate::schema::{Property, PropertyReference, SchemaError};

/// Upper bound for buffered upstream responses.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Compiled upstream service.
pub struct Service {
    pub name: String,
    pub base: Url,
    pub codec: Arc<dyn Codec>,
    pub timeout: Duration,
}

impl Service {
    pub fn new(
        name: impl Into<String>,
        address: &str,
        codec: Arc<dyn Codec>,
        timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        let base = if address.contains("://") {
            Url::parse(address)?
        } else {
            Url::parse(&format!("http://{address}"))?
        };

        Ok(Self {
            name: name.into(),
            base,
            codec,
            timeout,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    Literal(String),
    Reference(PropertyReference),
}

/// Request path whose segments are literals or `{{ resource:path }}`
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPath {
    segments: Vec<PathSegment>,
}

impl CallPath {
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let segments = raw
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                match segment
                    .strip_prefix("{{")
                    .and_then(|rest| rest.strip_suffix("}}"))
                {
                    Some(reference) => Ok(PathSegment::Reference(reference.trim().parse()?)),
                    None => Ok(PathSegment::Literal(segment.to_string())),
                }
            })
            .collect::<Result<_, SchemaError>>()?;

        Ok(Self { segments })
    }

    /// Concrete URL for a service, with reference segments percent-encoded.
    pub fn render(&self, base: &Url, store: &Store) -> Result<Url, StepError> {
        let mut url = base.clone();
        let mut values = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            let value = match segment {
                PathSegment::Literal(literal) => literal.clone(),
                PathSegment::Reference(reference) => {
                    match store.load(&reference.resource, &reference.path) {
                        Some(Reference::Value(serde_json::Value::String(text))) => text.clone(),
                        Some(Reference::Value(serde_json::Value::Null)) | None => {
                            return Err(StepError::MissingPathValue {
                                reference: reference.to_string(),
                            })
                        }
                        Some(cell) => cell.to_json().to_string(),
                    }
                }
            };
            values.push(value);
        }

        {
            let mut path = url.path_segments_mut().map_err(|_| StepError::Upstream {
                service: base.to_string(),
                message: "address cannot carry a path".to_string(),
            })?;
            path.clear();
            path.extend(values.iter());
        }

        Ok(url)
    }
}

/// A compiled service call.
pub struct ServiceCall {
    pub service: Arc<Service>,
    pub method: Method,
    pub path: CallPath,
    pub request: Option<Property>,
    pub response: Option<Property>,
}

impl ServiceCall {
    /// Call the service and store the decoded response under `resource`.
    pub async fn execute(
        &self,
        resource: &str,
        store: &mut Store,
        client: &UpstreamClient,
        request_id: &str,
    ) -> Result<(), StepError> {
        let body = self.dispatch(store, client, request_id).await?;
        if body.is_empty() {
            return Ok(());
        }

        let invalid = |source| StepError::Response {
            service: self.service.name.clone(),
            source,
        };

        let value = self.service.codec.decode(&body).map_err(invalid)?;
        store.store_values(resource, "", &value);

        if let Some(response) = &self.response {
            bind(response, resource, store).map_err(invalid)?;
        }

        Ok(())
    }

    /// Send the request and return the body of a successful response.
    pub async fn dispatch(
        &self,
        store: &Store,
        client: &UpstreamClient,
        request_id: &str,
    ) -> Result<Bytes, StepError> {
        let url = self.path.render(&self.service.base, store)?;
        let body = match &self.request {
            Some(request) => Some(Bytes::from(self.service.codec.marshal(request, store)?)),
            None => None,
        };

        let response = client
            .send(&self.service, &self.method, &url, body, request_id)
            .await?;

        if !response.status.is_success() {
            return Err(StepError::Status {
                service: self.service.name.clone(),
                status: response.status.as_u16(),
            });
        }

        Ok(response.body)
    }
}

/// Buffered upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Shared HTTP client for service calls.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    retry: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(connect_timeout: Duration, retry: RetryPolicy) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, retry }
    }

    /// Send a request, retrying connection errors, timeouts and 502/503/504.
    pub async fn send(
        &self,
        service: &Service,
        method: &Method,
        url: &Url,
        body: Option<Bytes>,
        request_id: &str,
    ) -> Result<UpstreamResponse, StepError> {
        let uri: Uri = url.as_str().parse().map_err(|e: axum::http::uri::InvalidUri| {
            StepError::Upstream {
                service: service.name.clone(),
                message: e.to_string(),
            }
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut builder = Request::builder()
                .method(method.clone())
                .uri(uri.clone())
                .header(X_REQUEST_ID, request_id);
            if body.is_some() {
                builder = builder.header(header::CONTENT_TYPE, service.codec.content_type());
            }

            let request = builder
                .body(body.clone().map(Body::from).unwrap_or_else(Body::empty))
                .map_err(|e| StepError::Upstream {
                    service: service.name.clone(),
                    message: e.to_string(),
                })?;

            let failure = match tokio::time::timeout(service.timeout, self.client.request(request)).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if !self.retry.should_retry(attempt, Some(status)) {
                        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
                            .await
                            .map_err(|e| StepError::Upstream {
                                service: service.name.clone(),
                                message: e.to_string(),
                            })?;

                        return Ok(UpstreamResponse { status, body });
                    }
                    format!("status {status}")
                }
                Ok(Err(error)) => {
                    if !self.retry.should_retry(attempt, None) {
                        return Err(StepError::Upstream {
                            service: service.name.clone(),
                            message: error.to_string(),
                        });
                    }
                    error.to_string()
                }
                Err(_) => {
                    if !self.retry.should_retry(attempt, None) {
                        return Err(StepError::Timeout {
                            service: service.name.clone(),
                            timeout: service.timeout,
                        });
                    }
                    "timed out".to_string()
                }
            };

            let delay = self.retry.delay(attempt);
            tracing::info!(
                request_id = %request_id,
                service = %service.name,
                attempt = attempt,
                delay = ?delay,
                error = %failure,
                "Retrying service call"
            );
            metrics::record_retry(&service.name);
            tokio::time::sleep(delay).await;
        }
    }
}
