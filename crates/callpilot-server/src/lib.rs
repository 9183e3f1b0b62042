//! CallPilot server library logic.

pub mod api;
pub mod api_ws;
pub mod config;
pub mod events;
pub mod session;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use callpilot_capability::Capabilities;
use callpilot_graph::{assist_graph, context_graph, Graph, GraphError, PipelineSettings};
use config::Config;
use session::SessionSettings;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The assist graph behind `POST /api/assist`. `None` when it failed
    /// to build.
    pub graph: Option<Arc<Graph>>,
    /// The context graph live sessions run before streaming a suggestion.
    pub session_graph: Option<Arc<Graph>>,
    /// Capability backends shared by the graph and the session coordinator.
    pub capabilities: Capabilities,
    /// Per-connection session settings.
    pub session: SessionSettings,
}

impl AppState {
    /// Builds the capability set and the assist graph from configuration.
    ///
    /// A graph that fails validation is logged and left out; the server
    /// still starts and reports `graph_ready: false`.
    pub fn from_config(config: &Config) -> Self {
        let capabilities = Capabilities::from_settings(&config.llm);
        Self::with_capabilities(config, capabilities)
    }

    /// Like [`from_config`](Self::from_config) with caller-supplied backends.
    pub fn with_capabilities(config: &Config, capabilities: Capabilities) -> Self {
        let pipeline = PipelineSettings {
            top_k: config.knowledge.top_k,
            node_timeout: config.graph.node_timeout(),
        };
        let graph = ready("assist", assist_graph(&capabilities, &pipeline));
        let session_graph = ready("session", context_graph(&capabilities, &pipeline));

        let session = SessionSettings {
            outbound_buffer: config.session.outbound_buffer,
            max_text_len: config.session.max_text_len,
            offset_unit: config.session.offset_unit,
            suggestion_timeout: config.graph.node_timeout(),
            evaluation_timeout: config::bounded(config.session.evaluation_timeout_ms),
            lookup_timeout: config::bounded(config.session.lookup_timeout_ms),
        };

        Self {
            graph,
            session_graph,
            capabilities,
            session,
        }
    }

    /// Whether every graph the server routes to was constructed.
    pub fn graphs_ready(&self) -> bool {
        self.graph.is_some() && self.session_graph.is_some()
    }
}

fn ready(name: &str, built: Result<Graph, GraphError>) -> Option<Arc<Graph>> {
    match built {
        Ok(graph) => {
            tracing::info!(graph = name, levels = ?graph.levels(), "graph ready");
            Some(Arc::new(graph))
        }
        Err(e) => {
            tracing::error!(graph = name, error = %e, "graph failed validation");
            None
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/api/assist", post(api::assist_handler))
        .route("/ws", get(api_ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
