//! Importing a legacy clip export for one user.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use linkbrain_core::UserId;
use linkbrain_server::config::{ConfigError, ServerConfig};
use linkbrain_server::db::{self, RepositoryError, UserRepository};
use linkbrain_server::services::import::{self, ImportOutcome, MAX_IMPORT_BATCH};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Could not read export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export must be an array of clips or an object with a \"clips\" array")]
    UnexpectedShape,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Import every document in `path` for the user, in batches.
///
/// # Errors
///
/// Returns `ImportError` if the file cannot be read, the user does not exist
/// or a batch fails to insert. Batches already inserted stay.
pub async fn run(path: &Path, raw_user_id: &str) -> Result<ImportOutcome, ImportError> {
    let user_id: UserId = raw_user_id
        .trim()
        .parse()
        .map_err(|_| ImportError::InvalidUserId(raw_user_id.to_owned()))?;
    let docs = read_documents(path)?;

    let config = ServerConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    if UserRepository::new(&pool).get_by_id(user_id).await?.is_none() {
        return Err(ImportError::UserNotFound(user_id));
    }

    tracing::info!(count = docs.len(), path = %path.display(), "Importing legacy clips");

    let mut total = ImportOutcome {
        imported: 0,
        created_categories: 0,
        skipped: Vec::new(),
    };
    for (batch, chunk) in docs.chunks(MAX_IMPORT_BATCH).enumerate() {
        let outcome = import::import(&pool, user_id, chunk, config.utc_offset).await?;
        total.imported += outcome.imported;
        total.created_categories += outcome.created_categories;
        total.skipped.extend(outcome.skipped.into_iter().map(|mut skipped| {
            skipped.index += batch * MAX_IMPORT_BATCH;
            skipped
        }));
    }

    Ok(total)
}

/// Load the export file.
///
/// # Errors
///
/// Returns `ImportError` if the file is unreadable, not JSON or not a known shape.
pub fn read_documents(path: &Path) -> Result<Vec<Value>, ImportError> {
    let raw = std::fs::read_to_string(path)?;
    documents_from(serde_json::from_str(&raw)?)
}

fn documents_from(value: Value) -> Result<Vec<Value>, ImportError> {
    match value {
        Value::Array(docs) => Ok(docs),
        Value::Object(mut map) => match map.remove("clips") {
            Some(Value::Array(docs)) => Ok(docs),
            _ => Err(ImportError::UnexpectedShape),
        },
        _ => Err(ImportError::UnexpectedShape),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_accepts_bare_array_and_wrapped_object() {
        let docs = documents_from(json!([{"url": "https://a.example"}])).unwrap();
        assert_eq!(docs.len(), 1);

        let docs = documents_from(json!({"clips": [{"url": "https://a.example"}, {}]})).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(matches!(
            documents_from(json!({"items": []})),
            Err(ImportError::UnexpectedShape)
        ));
        assert!(matches!(
            documents_from(json!("clips")),
            Err(ImportError::UnexpectedShape)
        ));
    }

    #[test]
    fn test_read_documents_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"url": "https://a.example", "createdAt": 1710485112}}]"#).unwrap();
        let docs = read_documents(file.path()).unwrap();
        assert_eq!(docs.len(), 1);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        assert!(matches!(read_documents(bad.path()), Err(ImportError::Json(_))));
    }
}
