//! Announcement management.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use linkbrain_core::AnnouncementId;

use crate::db::AnnouncementRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Announcement;
use crate::models::content::AnnouncementChanges;
use crate::routes::content::bounded;
use crate::routes::extract::{ApiJson, ApiPath};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 20_000;

#[derive(Debug, Serialize)]
pub struct AnnouncementList {
    pub announcements: Vec<Announcement>,
}

/// Every announcement, drafts included.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<AnnouncementList>> {
    let announcements = AnnouncementRepository::new(state.pool()).list_all().await?;
    Ok(Json(AnnouncementList { announcements }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub pinned: bool,
}

pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiJson(body): ApiJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>)> {
    let title = bounded("Title", &body.title, MAX_TITLE_LEN)?;
    let content = bounded("Content", &body.content, MAX_CONTENT_LEN)?;

    let announcement = AnnouncementRepository::new(state.pool())
        .create(title, content, body.is_published, body.pinned)
        .await?;
    tracing::info!(announcement_id = %announcement.id, "Announcement created");
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
    pub pinned: Option<bool>,
}

pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<AnnouncementId>,
    ApiJson(body): ApiJson<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>> {
    let changes = AnnouncementChanges {
        title: body
            .title
            .as_deref()
            .map(|t| bounded("Title", t, MAX_TITLE_LEN).map(str::to_string))
            .transpose()?,
        content: body
            .content
            .as_deref()
            .map(|c| bounded("Content", c, MAX_CONTENT_LEN).map(str::to_string))
            .transpose()?,
        is_published: body.is_published,
        pinned: body.pinned,
    };
    if changes.title.is_none()
        && changes.content.is_none()
        && changes.is_published.is_none()
        && changes.pinned.is_none()
    {
        return Err(AppError::BadRequest("No changes given".to_string()));
    }

    let announcement = AnnouncementRepository::new(state.pool())
        .update(id, &changes)
        .await?;
    Ok(Json(announcement))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<AnnouncementId>,
) -> Result<StatusCode> {
    AnnouncementRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
