use axum::extract::{Path, State};
use axum::Extension;

use crate::auth::AuthUser;
use crate::response::{AppError, SuccessResponse};
use crate::services::analytics::{self, AnalyticsError, QuizAnalytics};
use crate::state::AppState;

pub async fn quiz_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(quiz_id): Path<String>,
) -> Result<SuccessResponse<QuizAnalytics>, AppError> {
    let proxy = super::adaptive::require_db(&state)?;
    let output = analytics::quiz_analytics(&proxy, &user, &quiz_id)
        .await
        .map_err(|err| match err {
            AnalyticsError::NotFound(message) => AppError::not_found(message),
            AnalyticsError::Forbidden(message) => AppError::forbidden(message),
            AnalyticsError::Sql(inner) => {
                tracing::error!(error = %inner, "database failure in quiz analytics");
                AppError::internal(inner.to_string())
            }
        })?;
    Ok(SuccessResponse::new(output))
}
