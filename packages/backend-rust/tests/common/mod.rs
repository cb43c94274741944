#![allow(dead_code)]

use axum::Router;

pub async fn create_test_app() -> Router {
    std::env::set_var("DATABASE_URL", "sqlite::memory:");
    std::env::set_var("JWT_SECRET", "test-secret");

    adaptiq_backend_rust::create_app().await
}

pub fn bearer_token(user_id: &str, role: &str) -> String {
    let token = adaptiq_backend_rust::auth::sign_jwt_for_user(user_id, role)
        .expect("JWT_SECRET is set by create_test_app");
    format!("Bearer {token}")
}
