//! Clips and categories.

use chrono::{DateTime, Utc};
use serde::Serialize;

use linkbrain_core::analytics::ClipSnapshot;
use linkbrain_core::{CategoryId, ClipId, HexColor, Platform, UserId};

/// Maximum page size for clip listings.
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// A saved link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    pub user_id: UserId,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clip {
    #[must_use]
    pub const fn snapshot(&self) -> ClipSnapshot {
        ClipSnapshot {
            user_id: self.user_id,
            created_at: self.created_at,
            platform: self.platform,
        }
    }
}

/// A clip about to be inserted.
#[derive(Debug, Clone)]
pub struct NewClip {
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub category_id: Option<CategoryId>,
    /// Set for imported clips; new clips use the insert time.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewClip {
    #[must_use]
    pub fn platform(&self) -> Platform {
        Platform::detect(&self.url)
    }
}

/// Keywords kept per clip.
pub const MAX_CLIP_KEYWORDS: usize = 20;

/// Check that a clip URL is an absolute `http(s)` URL and return it in
/// canonical form.
///
/// # Errors
///
/// Returns a message suitable for the client when the URL is unusable.
pub fn normalize_url(raw: &str) -> Result<String, String> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| format!("Invalid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed.into()),
        _ => Err("URL must use http or https".to_string()),
    }
}

/// Fallback title for a clip saved without one: the bare host name.
#[must_use]
pub fn title_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string())
}

/// Trim, drop blanks and case-insensitive duplicates, keep at most
/// [`MAX_CLIP_KEYWORDS`].
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    keywords
        .into_iter()
        .filter_map(|k| {
            let k = k.as_ref().trim();
            (!k.is_empty() && seen.insert(k.to_lowercase())).then(|| k.to_string())
        })
        .take(MAX_CLIP_KEYWORDS)
        .collect()
}

/// Whether storing `adding` more clips on top of `current` would pass the
/// free plan `limit`.
#[must_use]
pub fn exceeds_clip_limit(limit: i64, current: i64, adding: usize) -> bool {
    let adding = i64::try_from(adding).unwrap_or(i64::MAX);
    current.saturating_add(adding) > limit
}

/// Partial update of a clip. `None` leaves a field untouched; for nullable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ClipChanges {
    pub title: Option<String>,
    pub summary: Option<Option<String>>,
    pub keywords: Option<Vec<String>>,
    pub category_id: Option<Option<CategoryId>>,
}

impl ClipChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.summary.is_none()
            && self.keywords.is_none()
            && self.category_id.is_none()
    }
}

/// Filters for listing a user's clips.
#[derive(Debug, Clone)]
pub struct ClipQuery {
    pub category_id: Option<CategoryId>,
    /// Case-insensitive match on title, summary, URL or keyword.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ClipQuery {
    fn default() -> Self {
        Self {
            category_id: None,
            search: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ClipQuery {
    /// Clamp paging to sane bounds.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        self.offset = self.offset.max(0);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

/// Longest category name accepted, in characters.
pub const MAX_CATEGORY_NAME_LEN: usize = 50;

/// A user-defined folder for clips.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: String,
    pub color: HexColor,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub clip_count: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_normalization() {
        let query = ClipQuery {
            category_id: None,
            search: Some("   ".to_string()),
            limit: 10_000,
            offset: -4,
        }
        .normalized();
        assert_eq!(query.limit, MAX_PAGE_SIZE);
        assert_eq!(query.offset, 0);
        assert_eq!(query.search, None);

        let query = ClipQuery {
            limit: 0,
            search: Some(" rust ".to_string()),
            ..ClipQuery::default()
        }
        .normalized();
        assert_eq!(query.limit, 1);
        assert_eq!(query.search.as_deref(), Some("rust"));
    }

    #[test]
    fn test_new_clip_platform() {
        let clip = NewClip {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            title: "Talk".to_string(),
            summary: None,
            keywords: Vec::new(),
            category_id: None,
            created_at: None,
        };
        assert_eq!(clip.platform(), Platform::Youtube);
    }

    #[test]
    fn test_empty_changes() {
        assert!(ClipChanges::default().is_empty());
        let changes = ClipChanges {
            summary: Some(None),
            ..ClipChanges::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url(" https://example.com ").unwrap(),
            "https://example.com/"
        );
        assert!(normalize_url("ftp://example.com/file").is_err());
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_title_from_url() {
        assert_eq!(title_from_url("https://www.rust-lang.org/learn"), "rust-lang.org");
        assert_eq!(title_from_url("garbage"), "garbage");
    }

    #[test]
    fn test_normalize_keywords() {
        let keywords = normalize_keywords([" Rust ", "rust", "", "async", "  "]);
        assert_eq!(keywords, vec!["Rust".to_string(), "async".to_string()]);

        let many = normalize_keywords((0..50).map(|i| format!("k{i}")));
        assert_eq!(many.len(), MAX_CLIP_KEYWORDS);
    }

    #[test]
    fn test_exceeds_clip_limit() {
        assert!(!exceeds_clip_limit(10, 9, 1));
        assert!(exceeds_clip_limit(10, 10, 1));
        assert!(!exceeds_clip_limit(10, 10, 0));
        assert!(exceeds_clip_limit(10, 5, 6));
        assert!(!exceeds_clip_limit(10, 5, 5));
        assert!(exceeds_clip_limit(0, 0, 1));
        assert!(exceeds_clip_limit(10, i64::MAX, usize::MAX));
    }
}
