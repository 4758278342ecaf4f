//! HTTP server module
//!
//! Exposes the rule API. Write endpoints are guarded by the bearer-token
//! middleware in [`auth`] when an API key is configured.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{config::ServerConfig, persistence::AppRepository, subscription::SubscriptionRequester};

mod auth;
mod error;
mod rules;

pub use error::ApiError;

/// Shared state of the request handlers.
#[derive(Clone)]
pub struct ApiState {
    /// Rule and notification store.
    pub repo: Arc<dyn AppRepository>,
    /// Queue to the event loop owning the subscriptions.
    pub subscriptions: SubscriptionRequester,
    /// Bearer token required by write endpoints, if any.
    pub api_key: Option<String>,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn router(state: ApiState) -> Router {
    let require_key = middleware::from_fn_with_state(state.clone(), auth::auth);

    Router::new()
        .route("/health", get(health))
        .route("/rules", get(rules::get_rules).merge(post(rules::create_rule).route_layer(require_key.clone())))
        .route("/rules/{id}", get(rules::get_rule).merge(delete(rules::delete_rule).route_layer(require_key)))
        .route("/rules/{id}/notifications", get(rules::get_rule_notifications))
        .with_state(state)
}

/// Serves the API on `listener` until `cancellation_token` fires.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    cancellation_token: CancellationToken,
) -> Result<(), std::io::Error> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!(%address, "HTTP server listening.");
    }
    axum::serve(listener, router(state)).with_graceful_shutdown(cancellation_token.cancelled_owned()).await
}

/// Binds the configured listen address and serves the API until
/// `cancellation_token` fires.
pub async fn run_server_from_config(
    config: &ServerConfig,
    repo: Arc<dyn AppRepository>,
    subscriptions: SubscriptionRequester,
    cancellation_token: CancellationToken,
) -> Result<(), std::io::Error> {
    let address: SocketAddr = config
        .listen_address
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Invalid listen_address: {e}")))?;
    let listener = TcpListener::bind(address).await?;

    if config.api_key.is_none() {
        tracing::warn!("No API key configured; rule write endpoints are unauthenticated.");
    }
    let state = ApiState { repo, subscriptions, api_key: config.api_key.clone() };
    serve(listener, state, cancellation_token).await
}
