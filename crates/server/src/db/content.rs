//! Admin-managed content: announcements, support inquiries and popups.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use linkbrain_core::{AnnouncementId, Email, InquiryId, InquiryStatus, PopupId, UserId};

use super::RepositoryError;
use crate::models::content::{AnnouncementChanges, PopupFields};
use crate::models::{Announcement, Inquiry, Popup};

// =============================================================================
// Announcements
// =============================================================================

const ANNOUNCEMENT_COLUMNS: &str = "id, title, content, is_published, pinned, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct AnnouncementRow {
    id: Uuid,
    title: String,
    content: String,
    is_published: bool,
    pinned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AnnouncementRow> for Announcement {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            id: AnnouncementId::new(row.id),
            title: row.title,
            content: row.content,
            is_published: row.is_published,
            pinned: row.pinned,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct AnnouncementRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnnouncementRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published announcements, pinned first, then newest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(&self) -> Result<Vec<Announcement>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE is_published \
             ORDER BY pinned DESC, created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every announcement, drafts included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Announcement>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        title: &str,
        content: &str,
        is_published: bool,
        pinned: bool,
    ) -> Result<Announcement, RepositoryError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            r"
            INSERT INTO announcements (id, title, content, is_published, pinned)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ANNOUNCEMENT_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(content)
        .bind(is_published)
        .bind(pinned)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement does not exist.
    pub async fn update(
        &self,
        id: AnnouncementId,
        changes: &AnnouncementChanges,
    ) -> Result<Announcement, RepositoryError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            r"
            UPDATE announcements SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                is_published = COALESCE($4, is_published),
                pinned = COALESCE($5, pinned),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ANNOUNCEMENT_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(changes.title.as_deref())
        .bind(changes.content.as_deref())
        .bind(changes.is_published)
        .bind(changes.pinned)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement does not exist.
    pub async fn delete(&self, id: AnnouncementId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "announcements", id.as_uuid()).await
    }
}

// =============================================================================
// Inquiries
// =============================================================================

const INQUIRY_COLUMNS: &str =
    "id, user_id, email, subject, message, status, reply, replied_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct InquiryRow {
    id: Uuid,
    user_id: Uuid,
    email: String,
    subject: String,
    message: String,
    status: InquiryStatus,
    reply: Option<String>,
    replied_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InquiryRow> for Inquiry {
    type Error = RepositoryError;

    fn try_from(row: InquiryRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid inquiry email in database: {e}"))
        })?;

        Ok(Self {
            id: InquiryId::new(row.id),
            user_id: UserId::new(row.user_id),
            email,
            subject: row.subject,
            message: row.message,
            status: row.status,
            reply: row.reply,
            replied_at: row.replied_at,
            created_at: row.created_at,
        })
    }
}

pub struct InquiryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InquiryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        email: &Email,
        subject: &str,
        message: &str,
    ) -> Result<Inquiry, RepositoryError> {
        let row = sqlx::query_as::<_, InquiryRow>(&format!(
            r"
            INSERT INTO inquiries (id, user_id, email, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {INQUIRY_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(user_id.as_uuid())
        .bind(email.as_str())
        .bind(subject)
        .bind(message)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Inquiry>, RepositoryError> {
        let rows = sqlx::query_as::<_, InquiryRow>(&format!(
            "SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// All inquiries, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<InquiryStatus>) -> Result<Vec<Inquiry>, RepositoryError> {
        let rows = sqlx::query_as::<_, InquiryRow>(&format!(
            "SELECT {INQUIRY_COLUMNS} FROM inquiries \
             WHERE ($1::inquiry_status IS NULL OR status = $1) \
             ORDER BY created_at DESC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InquiryId) -> Result<Option<Inquiry>, RepositoryError> {
        let row = sqlx::query_as::<_, InquiryRow>(&format!(
            "SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Store a new status, and a reply when one is given.
    ///
    /// The update only applies while the row still has `expected` status, so
    /// two admins acting at once cannot both move it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the status changed underneath.
    pub async fn transition(
        &self,
        id: InquiryId,
        expected: InquiryStatus,
        next: InquiryStatus,
        reply: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Inquiry, RepositoryError> {
        let row = sqlx::query_as::<_, InquiryRow>(&format!(
            r"
            UPDATE inquiries SET
                status = $3,
                reply = COALESCE($4, reply),
                replied_at = CASE WHEN $4 IS NULL THEN replied_at ELSE $5 END
            WHERE id = $1 AND status = $2
            RETURNING {INQUIRY_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(expected)
        .bind(next)
        .bind(reply)
        .bind(now)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("Inquiry was modified concurrently".to_owned()))?;

        row.try_into()
    }
}

// =============================================================================
// Popups
// =============================================================================

const POPUP_COLUMNS: &str =
    "id, title, content, image_url, link_url, is_active, starts_at, ends_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct PopupRow {
    id: Uuid,
    title: String,
    content: String,
    image_url: Option<String>,
    link_url: Option<String>,
    is_active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<PopupRow> for Popup {
    fn from(row: PopupRow) -> Self {
        Self {
            id: PopupId::new(row.id),
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            link_url: row.link_url,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
        }
    }
}

pub struct PopupRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PopupRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Popup>, RepositoryError> {
        let rows = sqlx::query_as::<_, PopupRow>(&format!(
            "SELECT {POPUP_COLUMNS} FROM popups ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Popups that are switched on and inside their window at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Popup>, RepositoryError> {
        let rows = sqlx::query_as::<_, PopupRow>(&format!(
            r"
            SELECT {POPUP_COLUMNS} FROM popups
            WHERE is_active
              AND (starts_at IS NULL OR starts_at <= $1)
              AND (ends_at IS NULL OR ends_at > $1)
            ORDER BY created_at DESC
            "
        ))
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PopupId) -> Result<Option<Popup>, RepositoryError> {
        let row = sqlx::query_as::<_, PopupRow>(&format!(
            "SELECT {POPUP_COLUMNS} FROM popups WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, fields: &PopupFields) -> Result<Popup, RepositoryError> {
        let row = sqlx::query_as::<_, PopupRow>(&format!(
            r"
            INSERT INTO popups (id, title, content, image_url, link_url, is_active, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {POPUP_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(fields.image_url.as_deref())
        .bind(fields.link_url.as_deref())
        .bind(fields.is_active)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace every editable field of a popup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the popup does not exist.
    pub async fn replace(&self, id: PopupId, fields: &PopupFields) -> Result<Popup, RepositoryError> {
        let row = sqlx::query_as::<_, PopupRow>(&format!(
            r"
            UPDATE popups SET
                title = $2, content = $3, image_url = $4, link_url = $5,
                is_active = $6, starts_at = $7, ends_at = $8
            WHERE id = $1
            RETURNING {POPUP_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(fields.image_url.as_deref())
        .bind(fields.link_url.as_deref())
        .bind(fields.is_active)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the popup does not exist.
    pub async fn delete(&self, id: PopupId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "popups", id.as_uuid()).await
    }
}

async fn delete_by_id(pool: &PgPool, table: &'static str, id: Uuid) -> Result<(), RepositoryError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
