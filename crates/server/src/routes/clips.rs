//! Clip CRUD, legacy import and AI analysis.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use linkbrain_core::{CategoryId, ClipId, UserId};

use super::extract::{ApiJson, ApiPath, ApiQuery, nullable};
use crate::db::{CategoryRepository, ClipRepository, SettingsRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::clip::{
    ClipChanges, ClipQuery, DEFAULT_PAGE_SIZE, NewClip, exceeds_clip_limit, normalize_keywords,
    normalize_url, title_from_url,
};
use crate::models::settings::AiProviderKind;
use crate::models::Clip;
use crate::services::ai::{Analysis, AiError, AnalysisRequest};
use crate::services::import::{self, ImportOutcome, MAX_IMPORT_BATCH};
use crate::state::AppState;

/// Header carrying the caller's own LLM provider key.
pub const AI_KEY_HEADER: &str = "x-ai-api-key";

const MAX_TITLE_LEN: usize = 500;
const MAX_ANALYSIS_CONTENT_LEN: usize = 20_000;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClipList {
    pub clips: Vec<Clip>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<ClipList>> {
    let category_id = params
        .category
        .as_deref()
        .map(|raw| {
            raw.parse::<CategoryId>()
                .map_err(|_| AppError::BadRequest("Invalid category id".to_string()))
        })
        .transpose()?;

    let query = ClipQuery {
        category_id,
        search: params.q,
        limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        offset: params.offset.unwrap_or(0),
    }
    .normalized();

    let clips = ClipRepository::new(state.pool()).list(user_id, &query).await?;
    Ok(Json(ClipList {
        clips,
        limit: query.limit,
        offset: query.offset,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClipRequest {
    pub url: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub category_id: Option<CategoryId>,
}

/// Save a link. Users without premium access are held to the free clip limit.
///
/// Without a `categoryId` the clip goes to the caller's default category, if
/// one is set and still exists.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(body): ApiJson<CreateClipRequest>,
) -> Result<(StatusCode, Json<Clip>)> {
    let pool = state.pool();
    let url = normalize_url(&body.url).map_err(AppError::BadRequest)?;
    let title = match non_blank(body.title) {
        Some(title) => check_title(title)?,
        None => title_from_url(&url),
    };

    enforce_clip_limit(&state, user_id, 1).await?;
    let category_id = match body.category_id {
        Some(id) => {
            ensure_category(&state, user_id, id).await?;
            Some(id)
        }
        None => default_category(&state, user_id).await?,
    };

    let clip = ClipRepository::new(pool)
        .create(
            user_id,
            &NewClip {
                url,
                title,
                summary: non_blank(body.summary),
                keywords: normalize_keywords(&body.keywords),
                category_id,
                created_at: None,
            },
        )
        .await?;

    tracing::info!(clip_id = %clip.id, platform = %clip.platform, "Clip saved");
    Ok((StatusCode::CREATED, Json(clip)))
}

pub async fn show(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiPath(id): ApiPath<ClipId>,
) -> Result<Json<Clip>> {
    find_clip(&state, user_id, id).await.map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClipRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub summary: Option<Option<String>>,
    pub keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<CategoryId>>,
}

pub async fn update(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiPath(id): ApiPath<ClipId>,
    ApiJson(body): ApiJson<UpdateClipRequest>,
) -> Result<Json<Clip>> {
    let changes = ClipChanges {
        title: non_blank(body.title).map(check_title).transpose()?,
        summary: body.summary.map(non_blank),
        keywords: body.keywords.as_deref().map(normalize_keywords),
        category_id: body.category_id,
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("No changes given".to_string()));
    }
    if let Some(Some(category_id)) = changes.category_id {
        ensure_category(&state, user_id, category_id).await?;
    }

    let clip = ClipRepository::new(state.pool())
        .update(user_id, id, &changes)
        .await?;
    Ok(Json(clip))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiPath(id): ApiPath<ClipId>,
) -> Result<StatusCode> {
    ClipRepository::new(state.pool()).delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub clips: Vec<Value>,
}

/// Import clip documents exported from the old client. The free clip limit
/// counts every importable document in the batch.
pub async fn import(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(body): ApiJson<ImportRequest>,
) -> Result<Json<ImportOutcome>> {
    if body.clips.is_empty() {
        return Err(AppError::BadRequest("Nothing to import".to_string()));
    }
    if body.clips.len() > MAX_IMPORT_BATCH {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_IMPORT_BATCH} clips per import"
        )));
    }

    let (parsed, skipped) = import::parse_documents(&body.clips, state.utc_offset());
    enforce_clip_limit(&state, user_id, parsed.len()).await?;

    let outcome = import::store(state.pool(), user_id, parsed, skipped).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    /// Page text, when the client could extract it.
    pub content: Option<String>,
    /// Store the result on this clip.
    pub clip_id: Option<ClipId>,
    /// Overrides the provider from the user's preferences.
    pub provider: Option<AiProviderKind>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clip>,
}

/// Summarize and categorize a link with the caller's LLM key.
pub async fn analyze(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    headers: HeaderMap,
    ApiJson(body): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    let api_key = headers
        .get(AI_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| SecretString::from(k.to_string()))
        .ok_or(AiError::MissingApiKey)?;

    let clip = match body.clip_id {
        Some(id) => Some(find_clip(&state, user_id, id).await?),
        None => None,
    };

    let url = match (non_blank(body.url), &clip) {
        (Some(url), _) => normalize_url(&url).map_err(AppError::BadRequest)?,
        (None, Some(clip)) => clip.url.clone(),
        (None, None) => return Err(AppError::BadRequest("Missing url".to_string())),
    };
    let title = non_blank(body.title)
        .or_else(|| clip.as_ref().map(|c| c.title.clone()))
        .unwrap_or_else(|| title_from_url(&url));
    let content = non_blank(body.content)
        .map(|text| text.chars().take(MAX_ANALYSIS_CONTENT_LEN).collect::<String>());

    let pool = state.pool();
    let preferences = SettingsRepository::new(pool).preferences(user_id).await?;
    let categories = CategoryRepository::new(pool);
    let request = AnalysisRequest {
        url,
        title,
        content,
        categories: categories.names(user_id).await?,
        language: preferences.language.clone(),
    };

    let provider = body.provider.unwrap_or(preferences.ai_provider);
    let analysis = state.ai().analyze(provider, &api_key, &request).await?;

    let clip = match clip {
        Some(clip) => {
            let category_id = match analysis.category.as_deref() {
                Some(name) => categories.find_by_name(user_id, name).await?.map(|c| c.id),
                None => None,
            };
            let changes = ClipChanges {
                summary: preferences
                    .auto_summarize
                    .then(|| Some(analysis.summary.clone())),
                keywords: Some(normalize_keywords(&analysis.keywords)),
                category_id: (preferences.auto_categorize && category_id.is_some())
                    .then_some(category_id),
                ..ClipChanges::default()
            };
            Some(
                ClipRepository::new(pool)
                    .update(user_id, clip.id, &changes)
                    .await?,
            )
        }
        None => None,
    };

    Ok(Json(AnalyzeResponse { analysis, clip }))
}

async fn find_clip(state: &AppState, user_id: UserId, id: ClipId) -> Result<Clip> {
    ClipRepository::new(state.pool())
        .get(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Clip not found".to_string()))
}

async fn ensure_category(state: &AppState, user_id: UserId, id: CategoryId) -> Result<()> {
    CategoryRepository::new(state.pool())
        .get(user_id, id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest("Unknown category".to_string()))
}

/// The preferred default category, ignored once it has been deleted.
async fn default_category(state: &AppState, user_id: UserId) -> Result<Option<CategoryId>> {
    let preferences = SettingsRepository::new(state.pool()).preferences(user_id).await?;
    let Some(id) = preferences.default_category_id else {
        return Ok(None);
    };
    let category = CategoryRepository::new(state.pool()).get(user_id, id).await?;
    Ok(category.map(|c| c.id))
}

async fn enforce_clip_limit(state: &AppState, user_id: UserId, adding: usize) -> Result<()> {
    let pool = state.pool();
    let Some(limit) = SettingsRepository::new(pool).admin_settings().await?.free_clip_limit else {
        return Ok(());
    };

    let user = UserRepository::new(pool)
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if user.subscription(Utc::now()).has_premium_access {
        return Ok(());
    }

    let current = ClipRepository::new(pool).count_for_user(user_id).await?;
    if exceeds_clip_limit(limit, current, adding) {
        return Err(AppError::Forbidden(format!(
            "Free plan is limited to {limit} clips"
        )));
    }
    Ok(())
}

fn check_title(title: String) -> Result<String> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
