mod adaptive;
mod analytics;
mod health;
mod profiles;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::middleware::auth::require_auth;
use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/quiz/adaptive/generate", post(adaptive::generate))
        .route("/quiz/adaptive/response", post(adaptive::response))
        .route("/quiz/adaptive/complete", post(adaptive::complete))
        .route("/quiz/:quiz_id/analytics", get(analytics::quiz_analytics))
        .route("/profile", get(profiles::get_profile))
        .layer(middleware::from_fn(require_auth));

    Router::new()
        .nest("/health", health::router())
        .nest("/api", api)
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found")
}
