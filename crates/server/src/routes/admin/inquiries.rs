//! Support inquiry triage.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use linkbrain_core::{InquiryId, InquiryStatus};

use crate::db::InquiryRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Inquiry;
use crate::routes::content::bounded;
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

const MAX_REPLY_LEN: usize = 5000;

#[derive(Debug, Default, Deserialize)]
pub struct InquiryFilter {
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Serialize)]
pub struct InquiryList {
    pub inquiries: Vec<Inquiry>,
}

pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiQuery(filter): ApiQuery<InquiryFilter>,
) -> Result<Json<InquiryList>> {
    let inquiries = InquiryRepository::new(state.pool())
        .list(filter.status)
        .await?;
    Ok(Json(InquiryList { inquiries }))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub reply: String,
}

/// Answer an inquiry, or edit an earlier answer.
pub async fn reply(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<InquiryId>,
    ApiJson(body): ApiJson<ReplyRequest>,
) -> Result<Json<Inquiry>> {
    let reply = bounded("Reply", &body.reply, MAX_REPLY_LEN)?;
    transition(&state, id, InquiryStatus::Replied, Some(reply)).await
}

pub async fn close(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<InquiryId>,
) -> Result<Json<Inquiry>> {
    transition(&state, id, InquiryStatus::Closed, None).await
}

async fn transition(
    state: &AppState,
    id: InquiryId,
    next: InquiryStatus,
    reply: Option<&str>,
) -> Result<Json<Inquiry>> {
    let repo = InquiryRepository::new(state.pool());
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Inquiry not found".to_string()))?;

    if !current.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move inquiry from {} to {next}",
            current.status
        )));
    }

    let inquiry = repo
        .transition(id, current.status, next, reply, Utc::now())
        .await?;
    tracing::info!(inquiry_id = %id, from = %current.status, to = %next, "Inquiry updated");
    Ok(Json(inquiry))
}
