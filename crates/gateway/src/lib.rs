//! HTTP and WebSocket delivery for Stepwise.
//!
//! Routes:
//!
//! - `GET /`              greeting
//! - `GET /health`        liveness
//! - `GET /agent/stream`  plain-text progress stream for `?q=`
//! - `GET /agent/ui`      embedded demo page
//! - `GET /ws`            JWT-authenticated echo
//! - `GET /ws/test`       unauthenticated echo (only with `gateway.enable_test_ws`)
//!
//! Built on Axum; every route is wrapped in a `TraceLayer`.

pub mod auth;
pub mod connections;
pub mod frontend;
pub mod ws;

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use stepwise_agent::{ProgressStream, ReasoningLoop};
use stepwise_config::{AppConfig, CatalogSource};
use stepwise_core::error::Error;
use stepwise_core::tool::CapabilityCatalog;
use stepwise_mcp::McpConnector;
use tracing::{error, info, warn};

use crate::auth::JwtVerifier;
use crate::connections::ConnectionManager;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub agent: ReasoningLoop,
    /// `None` when no JWT secret is configured; `/ws` then refuses everyone.
    pub jwt: Option<JwtVerifier>,
    pub connections: ConnectionManager,
}

impl GatewayState {
    pub fn new(config: AppConfig, agent: ReasoningLoop) -> Result<Self, jsonwebtoken::errors::Error> {
        let jwt = JwtVerifier::from_config(&config.auth)?;
        Ok(Self {
            config,
            agent,
            jwt,
            connections: ConnectionManager::new(),
        })
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/agent/stream", get(agent_stream_handler))
        .route("/ws", get(ws::ws_handler));

    if state.config.gateway.enable_test_ws {
        warn!("Unauthenticated /ws/test endpoint is enabled");
        router = router.route("/ws/test", get(ws::ws_test_handler));
    }

    router
        .merge(frontend::frontend_router())
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire provider, tool connector and catalog into a reasoning loop.
///
/// With `agent.catalog = "remote"` this connects to the MCP server once to
/// read its tool list.
pub async fn build_agent(config: &AppConfig) -> Result<ReasoningLoop, Error> {
    let provider = stepwise_providers::build_from_config(config)?;
    let connector = Arc::new(McpConnector::from_config(&config.mcp)?);

    let catalog = match config.agent.catalog {
        CatalogSource::Builtin => stepwise_tools::default_catalog()?,
        CatalogSource::Remote => load_remote_catalog(&connector).await?,
    };
    info!(
        tools = catalog.len(),
        source = ?config.agent.catalog,
        model = provider.model(),
        "Agent ready"
    );

    Ok(
        ReasoningLoop::new(provider, connector, Arc::new(catalog))
            .with_max_rounds(config.agent.max_rounds)
            .with_max_tokens(config.model.max_tokens),
    )
}

/// Read the catalog from the tools an MCP server advertises.
pub async fn load_remote_catalog(connector: &McpConnector) -> Result<CapabilityCatalog, Error> {
    use stepwise_core::session::ToolSession;

    let mut session = connector.connect_sse().await?;
    let tools = session.list_tools().await?;
    Ok(CapabilityCatalog::from_definitions(&tools)?)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let agent = build_agent(&config).await?;
    let state = GatewayState::new(config, agent)?;
    if state.jwt.is_none() {
        warn!("No auth.secret_key configured; /ws will reject every connection");
    }
    let app = build_router(Arc::new(state));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Hello World" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct StreamQuery {
    q: String,
}

/// `GET /agent/stream?q=...`: one line per progress event.
///
/// The run lives inside the response body, so a client disconnect drops it
/// and releases its tool session.
async fn agent_stream_handler(
    State(state): State<SharedState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    info!(query_len = query.q.chars().count(), "Agent stream requested");
    let lines = progress_lines(state.agent.run(query.q));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Render a run as text lines; a failure becomes a final `[error] ...` line.
pub fn progress_lines(
    mut run: ProgressStream,
) -> impl Stream<Item = Result<String, Infallible>> + Send {
    async_stream::stream! {
        while let Some(item) = run.next().await {
            match item {
                Ok(event) => yield Ok(format!("{event}\n")),
                Err(e) => {
                    error!(error = %e, "Agent run failed");
                    yield Ok(format!("[error] {e}\n"));
                    break;
                }
            }
        }
    }
}
