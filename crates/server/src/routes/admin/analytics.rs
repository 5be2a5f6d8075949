//! Dashboard analytics.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;

use linkbrain_core::analytics::AnalyticsReport;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsParams {
    /// Drop the cached report and recompute.
    #[serde(default)]
    pub refresh: bool,
}

pub async fn report(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiQuery(params): ApiQuery<AnalyticsParams>,
) -> Result<Json<Arc<AnalyticsReport>>> {
    if params.refresh {
        state.analytics().invalidate().await;
    }
    Ok(Json(state.analytics().report(state.pool()).await))
}
