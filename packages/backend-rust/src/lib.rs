#![allow(dead_code)]

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub async fn create_app() -> axum::Router {
    let db_proxy = match db::DatabaseProxy::from_env().await {
        Ok(proxy) => Some(proxy),
        Err(err) => {
            tracing::warn!(error = %err, "database proxy not initialized");
            None
        }
    };

    let state = AppState::new(db_proxy);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
