//! Announcements, support inquiries and popups.

use chrono::{DateTime, Utc};
use serde::Serialize;

use linkbrain_core::{AnnouncementId, Email, InquiryId, InquiryStatus, PopupId, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of an announcement.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
    pub pinned: Option<bool>,
}

/// A support request from a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: InquiryId,
    pub user_id: UserId,
    pub email: Email,
    pub subject: String,
    pub message: String,
    pub status: InquiryStatus,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An in-app popup shown while active and inside its time window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Popup {
    pub id: PopupId,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Popup {
    /// Whether the popup should be shown at `now`.
    #[must_use]
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now < end)
    }
}

/// Fields for creating or replacing a popup.
#[derive(Debug, Clone)]
pub struct PopupFields {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn popup(is_active: bool, starts_at: Option<DateTime<Utc>>, ends_at: Option<DateTime<Utc>>) -> Popup {
        Popup {
            id: PopupId::new_v4(),
            title: "Spring update".to_string(),
            content: "New AI summaries".to_string(),
            image_url: None,
            link_url: None,
            is_active,
            starts_at,
            ends_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_popup_visibility_window() {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let hour = Duration::hours(1);

        assert!(popup(true, None, None).is_visible_at(now));
        assert!(!popup(false, None, None).is_visible_at(now));
        assert!(popup(true, Some(now - hour), Some(now + hour)).is_visible_at(now));
        assert!(!popup(true, Some(now + hour), None).is_visible_at(now));
        assert!(!popup(true, None, Some(now)).is_visible_at(now));
    }
}
