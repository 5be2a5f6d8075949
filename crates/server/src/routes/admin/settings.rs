//! Global admin settings.

use axum::{Json, extract::State};

use crate::db::SettingsRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::AdminSettings;
use crate::routes::extract::ApiJson;
use crate::state::AppState;

pub async fn show(State(state): State<AppState>, _admin: RequireAdmin) -> Result<Json<AdminSettings>> {
    let settings = SettingsRepository::new(state.pool()).admin_settings().await?;
    Ok(Json(settings))
}

/// Replace the settings document. Omitted fields take their defaults.
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiJson(settings): ApiJson<AdminSettings>,
) -> Result<Json<AdminSettings>> {
    if settings.free_clip_limit.is_some_and(|limit| limit < 0) {
        return Err(AppError::BadRequest("freeClipLimit cannot be negative".to_string()));
    }

    SettingsRepository::new(state.pool())
        .set_admin_settings(&settings)
        .await?;
    tracing::info!(?settings, "Admin settings updated");
    Ok(Json(settings))
}
