//! Application initialization

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use axum::Router;
use darkroom_core::Config;
use std::sync::Arc;

/// Build the application state and router from configuration.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let state = services::build_state(config).await?;
    let router = routes::setup_routes(&state.config, state.clone())?;
    Ok((state, router))
}
