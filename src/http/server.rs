//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the check and liveness handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and serve until shutdown
//! - Dispatch every non-health request to the policy engine
//!
//! # Design Decisions
//! - Every path and method is a check; only `/healthz` is routed explicitly
//! - The engine is immutable and shared through `Arc`, so handlers take no locks
//! - The evaluation deadline uses the same budget as the request timeout

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::health;
use crate::http::request::{into_check_request, request_id, MakeRequestUuid, MAX_BODY_BYTES};
use crate::http::response::render_or_internal;
use crate::policy::{CheckContext, Engine};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Budget for one policy evaluation.
    pub evaluation_budget: Duration,
}

/// HTTP server for the authorization checkpoint.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around a compiled engine.
    pub fn new(engine: Arc<Engine>, request_timeout: Duration) -> Self {
        let state = AppState {
            engine,
            evaluation_budget: request_timeout,
        };
        let router = Self::build_router(state, request_timeout);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route(health::LIVENESS_PATH, any(health::liveness))
            .fallback(check_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Authorization check handler.
/// Converts the request, runs the engine, and renders the chosen template.
async fn check_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(&request);
    let engine = &state.engine;
    let internal = &engine.responses().internal_error;

    let mut check = match into_check_request(request, MAX_BODY_BYTES).await {
        Ok(check) => check,
        Err(e) => {
            let decision = engine.internal_error();
            tracing::error!(
                request_id = %request_id,
                outcome = %decision.outcome,
                error = %e,
                "Could not build authorization request"
            );
            return render_or_internal(decision.template, internal);
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %check.method,
        host = %check.host,
        path = %check.path,
        body = %String::from_utf8_lossy(&check.body),
        "Authorization check received"
    );

    let ctx = CheckContext::now().with_budget(state.evaluation_budget);
    let decision = engine.decide(&mut check, &ctx);

    tracing::info!(
        request_id = %request_id,
        method = %check.method,
        path = %check.path,
        outcome = %decision.outcome,
        requirement = decision.denied_by.unwrap_or("-"),
        "Authorization decision"
    );

    render_or_internal(decision.template, internal)
}
