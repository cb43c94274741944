use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};

use crate::auth::AuthUser;
use crate::db::DatabaseProxy;
use crate::response::{AppError, SuccessResponse};
use crate::services::adaptive_session::{
    self, CompleteQuizInput, CompleteQuizOutput, GenerateQuizInput, GeneratedQuizOutput,
    RecordResponseInput, RecordResponseOutput, SessionError,
};
use crate::services::ai_provider::AiError;
use crate::state::AppState;

pub async fn generate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<GenerateQuizInput>,
) -> Result<SuccessResponse<GeneratedQuizOutput>, AppError> {
    let proxy = require_db(&state)?;
    let output =
        adaptive_session::generate_quiz(&proxy, &state.ai_provider(), &user.id, input)
            .await
            .map_err(map_session_error)?;
    Ok(SuccessResponse::new(output))
}

pub async fn response(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<RecordResponseInput>,
) -> Result<SuccessResponse<RecordResponseOutput>, AppError> {
    let proxy = require_db(&state)?;
    let output =
        adaptive_session::record_response(&proxy, &state.ai_provider(), &user.id, input)
            .await
            .map_err(map_session_error)?;
    Ok(SuccessResponse::new(output))
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CompleteQuizInput>,
) -> Result<SuccessResponse<CompleteQuizOutput>, AppError> {
    let proxy = require_db(&state)?;
    let output =
        adaptive_session::complete_quiz(&proxy, &state.ai_provider(), &user.id, input)
            .await
            .map_err(map_session_error)?;
    Ok(SuccessResponse::new(output))
}

pub(super) fn require_db(state: &AppState) -> Result<Arc<DatabaseProxy>, AppError> {
    state
        .db_proxy()
        .ok_or_else(|| AppError::service_unavailable("database not available"))
}

fn map_session_error(err: SessionError) -> AppError {
    match err {
        SessionError::Validation(message) => AppError::validation(message),
        SessionError::NotFound(message) => AppError::not_found(message),
        SessionError::Forbidden(message) => AppError::forbidden(message),
        SessionError::Upstream(inner) => {
            tracing::error!(error = %inner, "upstream AI call failed");
            match inner {
                AiError::Rejected(message) => AppError::upstream(message),
                other => AppError::upstream(other.to_string()),
            }
        }
        SessionError::Sql(inner) => {
            tracing::error!(error = %inner, "database failure in adaptive session");
            AppError::internal(inner.to_string())
        }
    }
}
