use axum::extract::State;
use axum::Extension;

use crate::auth::AuthUser;
use crate::response::{AppError, SuccessResponse};
use crate::services::profile::{self, ProfileError, ProfileView};
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<SuccessResponse<ProfileView>, AppError> {
    let proxy = super::adaptive::require_db(&state)?;
    let output = profile::get_profile_view(&proxy, &user.id)
        .await
        .map_err(|err| match err {
            ProfileError::Sql(inner) => {
                tracing::error!(error = %inner, "database failure loading profile");
                AppError::internal(inner.to_string())
            }
        })?;
    Ok(SuccessResponse::new(output))
}
