//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single gateway handler
//! - Wire up middleware (request ID, tracing, limits, timeout)
//! - Match endpoints, decode bodies, seed the store, run flows, marshal output
//! - Swap in recompiled gateways on config reload
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::codec::{check_keys, media_type, Codec};
use crate::config::GatewayConfig;
use crate::flow::ExecutionContext;
use crate::gateway::{CompileError, Endpoint, Gateway};
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::refs::{Store, StorePool};

/// Idle stores kept for reuse.
const MAX_IDLE_STORES: usize = 256;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ArcSwap<Gateway>>,
    pub pool: Arc<StorePool>,
    /// Bounds in-flight requests to `listener.max_connections`; excess
    /// requests wait for a slot.
    pub in_flight: Arc<Semaphore>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    gateway: Arc<ArcSwap<Gateway>>,
}

impl HttpServer {
    /// Compile `config` and build the router.
    pub fn new(config: &GatewayConfig) -> Result<Self, CompileError> {
        let gateway = Arc::new(ArcSwap::from_pointee(Gateway::compile(config)?));
        let state = AppState {
            gateway: gateway.clone(),
            pool: Arc::new(StorePool::new(MAX_IDLE_STORES)),
            in_flight: Arc::new(Semaphore::new(config.listener.max_connections)),
        };

        Ok(Self {
            router: Self::build_router(config, state),
            gateway,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Listener limits and the request timeout are fixed at startup; a
    /// reload only swaps the compiled gateway.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = %request_id(request.headers()),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(MapResponseBodyLayer::new(Body::new))
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size)),
            )
    }

    /// Shared handle to the active gateway.
    pub fn gateway(&self) -> Arc<ArcSwap<Gateway>> {
        self.gateway.clone()
    }

    /// Serve until `shutdown` fires. Configs arriving on `updates` are
    /// compiled and swapped in; compile failures keep the current gateway.
    pub async fn run(
        self,
        listener: TcpListener,
        updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoints = self.gateway.load().endpoint_count(),
            "HTTP server starting"
        );

        tokio::spawn(reload_loop(
            self.gateway.clone(),
            updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn reload_loop(
    gateway: Arc<ArcSwap<Gateway>>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match Gateway::compile(&config) {
                    Ok(compiled) => {
                        tracing::info!(
                            endpoints = compiled.endpoint_count(),
                            "Configuration reloaded"
                        );
                        gateway.store(Arc::new(compiled));
                    }
                    Err(e) => tracing::error!(
                        error = %e,
                        "Failed to compile reloaded config, keeping current gateway"
                    ),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Single entry point for every request.
async fn gateway_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let Ok(_permit) = state.in_flight.clone().acquire_owned().await else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let gateway = state.gateway.load_full();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);

    let Some(matched) = gateway.route(&parts.method, parts.uri.path()) else {
        tracing::warn!(
            request_id = %request_id,
            method = %parts.method,
            path = %parts.uri.path(),
            "No endpoint matched"
        );
        metrics::record_request("none", StatusCode::NOT_FOUND.as_u16(), start);
        return GatewayError::NotFound {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
        }
        .into_response_with(&request_id);
    };

    let endpoint = format!("{} {}", parts.method, matched.pattern);
    let mut store = state.pool.acquire();

    let response = match serve(
        &gateway,
        matched.target,
        &matched.params,
        &parts,
        body,
        &mut store,
        &request_id,
    )
    .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                endpoint = %endpoint,
                error = %e,
                "Request failed"
            );
            e.into_response_with(&request_id)
        }
    };

    metrics::record_request(&endpoint, response.status().as_u16(), start);
    response
}

async fn serve(
    gateway: &Gateway,
    endpoint: &Endpoint,
    params: &std::collections::BTreeMap<String, String>,
    parts: &Parts,
    body: Body,
    store: &mut Store,
    request_id: &str,
) -> Result<Response, GatewayError> {
    let limit = gateway.max_body_size();
    let bytes: Bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| GatewayError::PayloadTooLarge { limit })?;

    if !bytes.is_empty() {
        let codec = request_codec(gateway, endpoint, parts);
        let input = codec.decode(&bytes).map_err(GatewayError::Decode)?;
        check_keys(&input).map_err(GatewayError::Decode)?;
        if !input.is_null() {
            store.store_values("input", "", &input);
        }
    }

    for (name, value) in params {
        store.store_value("params", name, JsonValue::String(value.clone()));
    }

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            store.store_value("header", name.as_str(), JsonValue::String(value.to_string()));
        }
    }

    let flow = &endpoint.flow;
    flow.bind_input(store)?;

    let ctx = ExecutionContext {
        client: gateway.client(),
        request_id,
    };
    flow.execute(store, &ctx).await?;

    let Some(output) = &flow.output else {
        return Ok(StatusCode::OK.into_response());
    };

    let codec = &endpoint.response_codec;
    let rendered = codec.marshal(output, store).map_err(GatewayError::Render)?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(codec.content_type()))],
        rendered,
    )
        .into_response())
}

/// The endpoint codec unless the request declares a different known format.
fn request_codec(gateway: &Gateway, endpoint: &Endpoint, parts: &Parts) -> Arc<dyn Codec> {
    let Some(content_type) = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return endpoint.codec.clone();
    };

    if endpoint.codec.accepts(&media_type(content_type)) {
        return endpoint.codec.clone();
    }

    gateway
        .codecs()
        .for_content_type(content_type)
        .unwrap_or_else(|| endpoint.codec.clone())
}
