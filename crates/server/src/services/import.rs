//! Importing clip documents exported from the old client.
//!
//! Exported documents are loosely shaped: field names drifted between client
//! versions and dates come in several formats. Each document is normalized on
//! its own so one bad entry never sinks a whole batch.

use std::collections::HashMap;

use chrono::FixedOffset;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::instrument;

use linkbrain_core::timestamp::parse_timestamp;
use linkbrain_core::{CategoryId, HexColor, UserId};

use crate::db::categories::insert_category;
use crate::db::clips::insert_all;
use crate::db::{CategoryRepository, RepositoryError};
use crate::models::clip::{
    MAX_CATEGORY_NAME_LEN, NewClip, normalize_keywords, normalize_url, title_from_url,
};

/// Largest batch accepted in one import call.
pub const MAX_IMPORT_BATCH: usize = 500;

const TIMESTAMP_FIELDS: &[&str] = &["createdAt", "created_at", "savedAt", "timestamp", "date"];

/// A normalized legacy document. The category is still a name; the caller
/// resolves it against the user's categories.
#[derive(Debug, Clone)]
pub struct LegacyClip {
    pub clip: NewClip,
    pub category: Option<String>,
}

/// A document that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedClip {
    pub index: usize,
    pub reason: String,
}

/// Result of an import run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported: usize,
    pub created_categories: usize,
    pub skipped: Vec<SkippedClip>,
}

/// Import a batch of legacy documents for one user.
///
/// # Errors
///
/// Returns `RepositoryError` if a category lookup or an insert fails.
pub async fn import(
    pool: &PgPool,
    user_id: UserId,
    docs: &[Value],
    offset: FixedOffset,
) -> Result<ImportOutcome, RepositoryError> {
    let (parsed, skipped) = parse_documents(docs, offset);
    store(pool, user_id, parsed, skipped).await
}

/// Store already-parsed documents.
///
/// Category names are matched case-insensitively against the user's
/// categories; unknown ones are created. New categories and clips are
/// written in one transaction, so a failed batch leaves nothing behind.
///
/// # Errors
///
/// Returns `RepositoryError` if a category lookup or an insert fails.
#[instrument(skip(pool, parsed, skipped), fields(count = parsed.len()))]
pub async fn store(
    pool: &PgPool,
    user_id: UserId,
    parsed: Vec<LegacyClip>,
    skipped: Vec<SkippedClip>,
) -> Result<ImportOutcome, RepositoryError> {
    let categories = CategoryRepository::new(pool);
    let mut tx = pool.begin().await?;

    let mut resolved: HashMap<String, CategoryId> = HashMap::new();
    let mut created_categories = 0;
    let mut clips = Vec::with_capacity(parsed.len());

    for LegacyClip { mut clip, category } in parsed {
        if let Some(name) = category.filter(|n| n.chars().count() <= MAX_CATEGORY_NAME_LEN) {
            let key = name.to_lowercase();
            let id = if let Some(id) = resolved.get(&key) {
                *id
            } else {
                let id = match categories.find_by_name(user_id, &name).await? {
                    Some(existing) => existing.id,
                    None => {
                        created_categories += 1;
                        insert_category(&mut *tx, user_id, &name, &HexColor::default())
                            .await?
                            .id
                    }
                };
                resolved.insert(key, id);
                id
            };
            clip.category_id = Some(id);
        }
        clips.push(clip);
    }

    let created = insert_all(&mut *tx, user_id, &clips).await?;
    tx.commit().await?;
    tracing::info!(
        imported = created.len(),
        skipped = skipped.len(),
        created_categories,
        "Legacy clips imported"
    );

    Ok(ImportOutcome {
        imported: created.len(),
        created_categories,
        skipped,
    })
}

/// Normalize one legacy document.
///
/// # Errors
///
/// Returns the reason the document was rejected: not an object, or no usable
/// URL. Unparseable dates are not an error; the clip gets the insert time.
pub fn parse_document(doc: &Value, offset: FixedOffset) -> Result<LegacyClip, String> {
    let Value::Object(map) = doc else {
        return Err("document is not an object".to_string());
    };

    let raw_url = string_field(map, &["url", "link"]).ok_or("missing url")?;
    let url = normalize_url(raw_url)?;

    let title = string_field(map, &["title"])
        .map_or_else(|| title_from_url(&url), str::to_string);
    let summary = string_field(map, &["summary", "description"]).map(str::to_string);

    let keywords = match map.get("keywords").or_else(|| map.get("tags")) {
        Some(Value::Array(items)) => normalize_keywords(items.iter().filter_map(Value::as_str)),
        Some(Value::String(s)) => normalize_keywords(s.split(',')),
        _ => Vec::new(),
    };

    let category = string_field(map, &["category", "categoryName"]).map(str::to_string);

    let created_at = TIMESTAMP_FIELDS
        .iter()
        .filter_map(|field| map.get(*field))
        .find_map(|value| parse_timestamp(value, offset));

    Ok(LegacyClip {
        clip: NewClip {
            url,
            title,
            summary,
            keywords,
            category_id: None,
            created_at,
        },
        category,
    })
}

/// Normalize a batch, splitting it into importable clips and skipped entries.
#[must_use]
pub fn parse_documents(docs: &[Value], offset: FixedOffset) -> (Vec<LegacyClip>, Vec<SkippedClip>) {
    let mut parsed = Vec::with_capacity(docs.len());
    let mut skipped = Vec::new();

    for (index, doc) in docs.iter().enumerate() {
        match parse_document(doc, offset) {
            Ok(clip) => parsed.push(clip),
            Err(reason) => {
                tracing::debug!(index, %reason, "Skipping legacy clip");
                skipped.push(SkippedClip { index, reason });
            }
        }
    }

    (parsed, skipped)
}

/// First non-blank string among `names`.
fn string_field<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| map.get(*name).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}
