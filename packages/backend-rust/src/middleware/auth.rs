use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::response::json_error;

pub async fn require_auth(mut req: Request<Body>, next: Next) -> Response {
    let token = crate::auth::extract_token(req.headers());
    let Some(token) = token else {
        return json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "missing auth token")
            .into_response();
    };

    match crate::auth::verify_request_token(&token) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(_err) => json_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "authentication failed",
        )
        .into_response(),
    }
}
