//! WebTerm Server
//!
//! Multi-tab web terminal backend: executes commands per browser tab and
//! streams results, directory state, autocomplete suggestions, and live
//! system metrics over WebSocket.

mod autocomplete;
mod config;
mod dispatcher;
mod export;
mod hub;
mod logging;
mod metrics;
mod navigator;
mod registry;
mod resolver;
mod session;
mod session_actor;
mod session_command;
mod shell;
mod state;
mod transcript;
mod websocket;

use std::sync::Arc;

use axum::extract::State;
use axum::{response::IntoResponse, routing::get, Json, Router};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::hub::BroadcastHub;
use crate::metrics::MetricsSampler;
use crate::navigator::Navigator;
use crate::registry::CommandRegistry;
use crate::state::{AppContext, RegistrySettings, SessionRegistry};
use crate::transcript::TranscriptLog;
use crate::websocket::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _logging = logging::init_logging(&config.resolved_data_dir())?;

    info!("Starting WebTerm Server...");

    let root = config.resolved_root();
    info!(
        component = "server",
        event = "server.configured",
        root = %root.display(),
        sandbox = ?config.sandbox_root,
        history_limit = config.history_limit,
    );

    let transcripts = Arc::new(TranscriptLog::new(config.transcript_limit));
    let (sampler, metrics_reader) = MetricsSampler::new();
    let dispatcher = Arc::new(Dispatcher::new(
        CommandRegistry::new(),
        Navigator::new(root.clone(), config.sandbox_root.clone()),
        metrics_reader.clone(),
        transcripts.clone(),
        config.exec_timeout_secs,
    ));
    let hub = Arc::new(BroadcastHub::new());
    let sessions = SessionRegistry::new(
        dispatcher,
        hub.clone(),
        RegistrySettings {
            root,
            history_limit: config.history_limit,
            history_dedup: config.history_dedup,
            linger: config.session_linger(),
        },
    );

    // One background task drives the metrics feed, independent of
    // request handling.
    tokio::spawn(sampler.run(
        hub.clone(),
        Arc::downgrade(&sessions),
        config.metrics_interval(),
    ));

    let ctx = AppContext {
        sessions,
        hub,
        transcripts,
        metrics: metrics_reader,
    };

    // Build router
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/system-info", get(system_info_handler))
        .route("/api/export-logs", get(export::export_logs))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ctx);

    info!("Listening on {}", config.bind);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// One-shot metrics read for the dashboard, mirroring the broadcast shape.
async fn system_info_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    let snapshot = ctx.metrics.latest();
    Json(serde_json::json!({
        "cpu": snapshot.cpu(),
        "memory": snapshot.memory(),
        "process_count": snapshot.process_count,
    }))
}
