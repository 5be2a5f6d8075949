//! Category management.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use linkbrain_core::{CategoryId, HexColor};

use super::extract::{ApiJson, ApiPath};
use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::clip::MAX_CATEGORY_NAME_LEN;
use crate::models::{Category, CategoryWithCount};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategoryWithCount>,
}

pub async fn list(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<CategoryList>> {
    let categories = CategoryRepository::new(state.pool())
        .list_with_counts(user_id)
        .await?;
    Ok(Json(CategoryList { categories }))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Defaults to [`HexColor::DEFAULT`].
    pub color: Option<HexColor>,
}

pub async fn create(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(body): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let name = validate_name(&body.name)?;
    let color = body.color.unwrap_or_default();

    let category = CategoryRepository::new(state.pool())
        .create(user_id, name, &color)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<HexColor>,
}

pub async fn update(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(body): ApiJson<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    if body.name.is_none() && body.color.is_none() {
        return Err(AppError::BadRequest("No changes given".to_string()));
    }
    let name = body.name.as_deref().map(validate_name).transpose()?;

    let category = CategoryRepository::new(state.pool())
        .update(user_id, id, name, body.color.as_ref())
        .await?;
    Ok(Json(category))
}

/// Delete a category; its clips become uncategorized.
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_name(raw: &str) -> Result<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Category name is required".to_string()));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Category name must be at most {MAX_CATEGORY_NAME_LEN} characters"
        )));
    }
    Ok(name)
}
