//! Popup management.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkbrain_core::PopupId;

use crate::db::PopupRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Popup;
use crate::models::clip::normalize_url;
use crate::models::content::PopupFields;
use crate::routes::content::bounded;
use crate::routes::extract::{ApiJson, ApiPath, nullable};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 5000;

#[derive(Debug, Serialize)]
pub struct PopupList {
    pub popups: Vec<Popup>,
}

pub async fn list(State(state): State<AppState>, _admin: RequireAdmin) -> Result<Json<PopupList>> {
    let popups = PopupRepository::new(state.pool()).list_all().await?;
    Ok(Json(PopupList { popups }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePopupRequest {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiJson(body): ApiJson<CreatePopupRequest>,
) -> Result<(StatusCode, Json<Popup>)> {
    let fields = validate(PopupFields {
        title: body.title,
        content: body.content,
        image_url: body.image_url,
        link_url: body.link_url,
        is_active: body.is_active,
        starts_at: body.starts_at,
        ends_at: body.ends_at,
    })?;

    let popup = PopupRepository::new(state.pool()).create(&fields).await?;
    tracing::info!(popup_id = %popup.id, "Popup created");
    Ok((StatusCode::CREATED, Json(popup)))
}

/// Partial update. Nullable fields are cleared with an explicit `null`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePopupRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub link_url: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
}

pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<PopupId>,
    ApiJson(body): ApiJson<UpdatePopupRequest>,
) -> Result<Json<Popup>> {
    let repo = PopupRepository::new(state.pool());
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Popup not found".to_string()))?;

    let fields = validate(PopupFields {
        title: body.title.unwrap_or(current.title),
        content: body.content.unwrap_or(current.content),
        image_url: body.image_url.unwrap_or(current.image_url),
        link_url: body.link_url.unwrap_or(current.link_url),
        is_active: body.is_active.unwrap_or(current.is_active),
        starts_at: body.starts_at.unwrap_or(current.starts_at),
        ends_at: body.ends_at.unwrap_or(current.ends_at),
    })?;

    let popup = repo.replace(id, &fields).await?;
    Ok(Json(popup))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<PopupId>,
) -> Result<StatusCode> {
    PopupRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate(fields: PopupFields) -> Result<PopupFields> {
    let title = bounded("Title", &fields.title, MAX_TITLE_LEN)?.to_string();
    let content = bounded("Content", &fields.content, MAX_CONTENT_LEN)?.to_string();

    if let (Some(start), Some(end)) = (fields.starts_at, fields.ends_at)
        && end <= start
    {
        return Err(AppError::BadRequest("endsAt must be after startsAt".to_string()));
    }

    let image_url = optional_url(fields.image_url)?;
    let link_url = optional_url(fields.link_url)?;

    Ok(PopupFields {
        title,
        content,
        image_url,
        link_url,
        ..fields
    })
}

fn optional_url(raw: Option<String>) -> Result<Option<String>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| normalize_url(&s).map_err(AppError::BadRequest))
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn fields() -> PopupFields {
        PopupFields {
            title: " Sale ".to_string(),
            content: "Half off".to_string(),
            image_url: Some(String::new()),
            link_url: Some("https://linkbrain.app/pricing".to_string()),
            is_active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let fields = validate(fields()).unwrap();
        assert_eq!(fields.title, "Sale");
        assert_eq!(fields.image_url, None);
        assert_eq!(fields.link_url.as_deref(), Some("https://linkbrain.app/pricing"));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let now = Utc::now();
        let inverted = PopupFields {
            starts_at: Some(now),
            ends_at: Some(now - Duration::hours(1)),
            ..fields()
        };
        assert!(validate(inverted).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_link() {
        let bad = PopupFields {
            link_url: Some("javascript:void(0)".to_string()),
            ..fields()
        };
        assert!(validate(bad).is_err());
    }
}
