//! Category repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use linkbrain_core::{CategoryId, HexColor, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Category, CategoryWithCount};

const DUPLICATE_NAME: &str = "A category with this name already exists";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    color: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let color = HexColor::parse(&row.color).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid category color in database: {e}"))
        })?;

        Ok(Self {
            id: CategoryId::new(row.id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            color,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryCountRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    clip_count: i64,
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's categories with the number of clips in each, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_counts(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategoryWithCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryCountRow>(
            r"
            SELECT c.id, c.user_id, c.name, c.color, c.created_at,
                   COUNT(cl.id) AS clip_count
            FROM categories c
            LEFT JOIN clips cl ON cl.category_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id
            ORDER BY c.name
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryWithCount {
                    category: row.category.try_into()?,
                    clip_count: row.clip_count,
                })
            })
            .collect()
    }

    /// Just the category names, for prompting the LLM.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn names(&self, user_id: UserId) -> Result<Vec<String>, RepositoryError> {
        let names = sqlx::query_scalar("SELECT name FROM categories WHERE user_id = $1 ORDER BY name")
            .bind(user_id.as_uuid())
            .fetch_all(self.pool)
            .await?;
        Ok(names)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: CategoryId,
    ) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, user_id, name, color, created_at FROM categories WHERE id = $1 AND user_id = $2",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_name(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, user_id, name, color, created_at FROM categories
            WHERE user_id = $1 AND lower(name) = lower($2)
            LIMIT 1
            ",
        )
        .bind(user_id.as_uuid())
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a category
    /// with this name.
    pub async fn create(
        &self,
        user_id: UserId,
        name: &str,
        color: &HexColor,
    ) -> Result<Category, RepositoryError> {
        insert_category(self.pool, user_id, name, color).await
    }

    /// Rename or recolor a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such category.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        user_id: UserId,
        id: CategoryId,
        name: Option<&str>,
        color: Option<&HexColor>,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories SET
                name = COALESCE($3, name),
                color = COALESCE($4, color)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, color, created_at
            ",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(name)
        .bind(color.map(HexColor::as_str))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_NAME))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a category. Its clips become uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such category.
    pub async fn delete(&self, user_id: UserId, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Insert a category through any executor, so it can join a caller's
/// transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user already has a category
/// with this name.
pub(crate) async fn insert_category<'e, E>(
    executor: E,
    user_id: UserId,
    name: &str,
    color: &HexColor,
) -> Result<Category, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, CategoryRow>(
        r"
        INSERT INTO categories (id, user_id, name, color)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, name, color, created_at
        ",
    )
    .bind(Uuid::new_v4())
    .bind(user_id.as_uuid())
    .bind(name)
    .bind(color.as_str())
    .fetch_one(executor)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_NAME))?;

    row.try_into()
}
