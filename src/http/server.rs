//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all dispatcher
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Resolve every request against the current router snapshot
//! - Swap in a rebuilt router when the route table changes
//! - Map routing failures to 404 / 405

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RoutingConfig;
use crate::lifecycle::startup::{build_router, Endpoint, EndpointRouter};
use crate::routing::{Params, Resolution, RouterError, RouterResult};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ArcSwap<EndpointRouter>>,
}

/// JSON body describing a resolved request.
#[derive(Debug, Serialize)]
pub struct MatchedBody<'a> {
    pub route: &'a str,
    pub name: Option<&'a str>,
    pub response: &'a str,
    pub args: &'a [String],
    pub params: &'a Params,
    pub canonical_path: &'a str,
}

impl<'a> MatchedBody<'a> {
    pub fn new(resolution: &'a Resolution<Arc<Endpoint>>) -> Self {
        Self {
            route: &resolution.handler.route,
            name: resolution.handler.name.as_deref(),
            response: &resolution.handler.response,
            args: &resolution.args,
            params: &resolution.params,
            canonical_path: &resolution.canonical_path,
        }
    }
}

#[derive(Debug, Serialize)]
struct Failure {
    error: &'static str,
    message: String,
}

/// HTTP front for a route table.
pub struct HttpServer {
    router: Arc<ArcSwap<EndpointRouter>>,
    config: RoutingConfig,
}

impl HttpServer {
    /// Build and finalize the router for `config`.
    pub fn new(config: RoutingConfig) -> RouterResult<Self> {
        let router = build_router(&config)?;
        Ok(Self {
            router: Arc::new(ArcSwap::from_pointee(router)),
            config,
        })
    }

    /// Snapshot of the router currently serving requests.
    pub fn router(&self) -> Arc<EndpointRouter> {
        self.router.load_full()
    }

    /// Replace the live router with one built from `config`.
    ///
    /// On failure the current router keeps serving.
    pub fn reload(&self, config: &RoutingConfig) -> RouterResult<()> {
        swap_router(&self.router, config)
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_app(&self) -> Router {
        let state = AppState {
            router: self.router.clone(),
        };
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.server.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve until `shutdown` fires, applying route tables from `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RoutingConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live = self.router.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = swap_router(&live, &config) {
                    tracing::error!(error = %e, "Rejected route table, keeping current routes");
                }
            }
        });

        let app = self.build_app();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }
}

fn swap_router(live: &ArcSwap<EndpointRouter>, config: &RoutingConfig) -> RouterResult<()> {
    let router = build_router(config)?;
    let routes = router.routes().len();
    live.store(Arc::new(router));
    tracing::info!(routes, "Router swapped");
    Ok(())
}

/// Catch-all handler: resolve and describe the match.
async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let router = state.router.load();
    let path = uri.path();

    match router.resolve(path, Some(method.as_str())) {
        Ok(resolution) => (StatusCode::OK, Json(MatchedBody::new(&resolution))).into_response(),
        Err(err) => {
            tracing::debug!(method = %method, path = %path, error = %err, "Resolution failed");
            failure_response(err)
        }
    }
}

fn failure_response(err: RouterError) -> Response {
    let status = match &err {
        RouterError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
        RouterError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Json(Failure {
        error: err.kind(),
        message: err.to_string(),
    });

    match err {
        RouterError::MethodNotAllowed { allowed, .. } => {
            (status, [(header::ALLOW, allowed.join(", "))], body).into_response()
        }
        _ => (status, body).into_response(),
    }
}
