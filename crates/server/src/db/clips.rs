//! Clip repository. Every query is scoped to the owning user.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use linkbrain_core::analytics::ClipSnapshot;
use linkbrain_core::{CategoryId, ClipId, Platform, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::Clip;
use crate::models::clip::{ClipChanges, ClipQuery, NewClip};

const CLIP_COLUMNS: &str =
    "id, user_id, url, title, summary, keywords, category_id, platform, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ClipRow {
    id: Uuid,
    user_id: Uuid,
    url: String,
    title: String,
    summary: Option<String>,
    keywords: Vec<String>,
    category_id: Option<Uuid>,
    platform: Platform,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClipRow> for Clip {
    fn from(row: ClipRow) -> Self {
        Self {
            id: ClipId::new(row.id),
            user_id: UserId::new(row.user_id),
            url: row.url,
            title: row.title,
            summary: row.summary,
            keywords: row.keywords,
            category_id: row.category_id.map(CategoryId::new),
            platform: row.platform,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    user_id: Uuid,
    created_at: DateTime<Utc>,
    platform: Platform,
}

/// Repository for clip database operations.
pub struct ClipRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ClipRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's clips, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId, query: &ClipQuery) -> Result<Vec<Clip>, RepositoryError> {
        let pattern = query.search.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, ClipRow>(&format!(
            r"
            SELECT {CLIP_COLUMNS} FROM clips
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3::text IS NULL
                   OR title ILIKE $3
                   OR summary ILIKE $3
                   OR url ILIKE $3
                   OR EXISTS (SELECT 1 FROM unnest(keywords) AS k WHERE k ILIKE $3))
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(user_id.as_uuid())
        .bind(query.category_id.map(|id| id.as_uuid()))
        .bind(pattern)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Number of clips a user has saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clips WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId, id: ClipId) -> Result<Option<Clip>, RepositoryError> {
        let row = sqlx::query_as::<_, ClipRow>(&format!(
            "SELECT {CLIP_COLUMNS} FROM clips WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a clip, deriving its platform from the URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, user_id: UserId, clip: &NewClip) -> Result<Clip, RepositoryError> {
        let row = insert(self.pool, user_id, clip).await?;
        Ok(row.into())
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such clip.
    pub async fn update(
        &self,
        user_id: UserId,
        id: ClipId,
        changes: &ClipChanges,
    ) -> Result<Clip, RepositoryError> {
        let (set_summary, summary) = split_nullable(changes.summary.clone());
        let (set_category, category) = split_nullable(changes.category_id);

        let row = sqlx::query_as::<_, ClipRow>(&format!(
            r"
            UPDATE clips SET
                title = COALESCE($3, title),
                summary = CASE WHEN $4 THEN $5 ELSE summary END,
                keywords = COALESCE($6, keywords),
                category_id = CASE WHEN $7 THEN $8 ELSE category_id END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {CLIP_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(changes.title.as_deref())
        .bind(set_summary)
        .bind(summary)
        .bind(changes.keywords.as_deref())
        .bind(set_category)
        .bind(category.map(|c| c.as_uuid()))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a clip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such clip.
    pub async fn delete(&self, user_id: UserId, id: ClipId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM clips WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// The clip fields analytics needs, for every clip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_snapshots(&self) -> Result<Vec<ClipSnapshot>, RepositoryError> {
        let rows = sqlx::query_as::<_, SnapshotRow>("SELECT user_id, created_at, platform FROM clips")
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ClipSnapshot {
                user_id: UserId::new(row.user_id),
                created_at: row.created_at,
                platform: row.platform,
            })
            .collect())
    }
}

/// Insert clips on an open connection, typically inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any insert fails.
pub(crate) async fn insert_all(
    conn: &mut PgConnection,
    user_id: UserId,
    clips: &[NewClip],
) -> Result<Vec<Clip>, RepositoryError> {
    let mut created = Vec::with_capacity(clips.len());
    for clip in clips {
        created.push(insert(&mut *conn, user_id, clip).await?.into());
    }
    Ok(created)
}

async fn insert<'e, E>(executor: E, user_id: UserId, clip: &NewClip) -> Result<ClipRow, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ClipRow>(&format!(
        r"
        INSERT INTO clips (id, user_id, url, title, summary, keywords, category_id, platform,
                           created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, NOW()), COALESCE($9, NOW()))
        RETURNING {CLIP_COLUMNS}
        "
    ))
    .bind(Uuid::new_v4())
    .bind(user_id.as_uuid())
    .bind(&clip.url)
    .bind(&clip.title)
    .bind(clip.summary.as_deref())
    .bind(&clip.keywords)
    .bind(clip.category_id.map(|id| id.as_uuid()))
    .bind(clip.platform())
    .bind(clip.created_at)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Split a patch value into a "was set" flag and the new value.
fn split_nullable<T>(value: Option<Option<T>>) -> (bool, Option<T>) {
    match value {
        Some(inner) => (true, inner),
        None => (false, None),
    }
}
