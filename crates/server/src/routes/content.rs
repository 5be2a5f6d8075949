//! User-facing announcements, popups and support inquiries.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::extract::ApiJson;
use crate::db::{AnnouncementRepository, InquiryRepository, PopupRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Announcement, Inquiry, Popup};
use crate::state::AppState;

const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

#[derive(Debug, Serialize)]
pub struct AnnouncementList {
    pub announcements: Vec<Announcement>,
}

/// Published announcements, pinned first.
pub async fn announcements(State(state): State<AppState>) -> Result<Json<AnnouncementList>> {
    let announcements = AnnouncementRepository::new(state.pool())
        .list_published()
        .await?;
    Ok(Json(AnnouncementList { announcements }))
}

#[derive(Debug, Serialize)]
pub struct PopupList {
    pub popups: Vec<Popup>,
}

/// Popups to show right now.
pub async fn active_popups(State(state): State<AppState>) -> Result<Json<PopupList>> {
    let popups = PopupRepository::new(state.pool())
        .list_active(Utc::now())
        .await?;
    Ok(Json(PopupList { popups }))
}

#[derive(Debug, Serialize)]
pub struct InquiryList {
    pub inquiries: Vec<Inquiry>,
}

pub async fn inquiries(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<InquiryList>> {
    let inquiries = InquiryRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;
    Ok(Json(InquiryList { inquiries }))
}

#[derive(Debug, Deserialize)]
pub struct InquiryRequest {
    pub subject: String,
    pub message: String,
}

/// Submit a support inquiry. Replies go to the account email.
pub async fn submit_inquiry(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(body): ApiJson<InquiryRequest>,
) -> Result<(StatusCode, Json<Inquiry>)> {
    let subject = bounded("Subject", &body.subject, MAX_SUBJECT_LEN)?;
    let message = bounded("Message", &body.message, MAX_MESSAGE_LEN)?;

    let user = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let inquiry = InquiryRepository::new(state.pool())
        .create(user_id, &user.email, subject, message)
        .await?;
    tracing::info!(inquiry_id = %inquiry.id, "Inquiry submitted");
    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// Trimmed, non-empty and at most `max` characters.
pub(crate) fn bounded<'a>(field: &str, raw: &'a str, max: usize) -> Result<&'a str> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value)
}
