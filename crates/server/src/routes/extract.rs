//! Extractors that reject with the JSON error body instead of axum's plain text.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`: a missing
/// field stays `None`, an explicit `null` becomes `Some(None)`.
///
/// # Errors
///
/// Propagates the inner value's deserialization error.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Paging parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// `(limit, offset)` clamped to `1..=max` and `>= 0`.
    #[must_use]
    pub fn resolve(&self, default: i64, max: i64) -> (i64, i64) {
        (
            self.limit.unwrap_or(default).clamp(1, max),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        summary: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_absent_and_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.summary, None);

        let null: Patch = serde_json::from_str(r#"{"summary": null}"#).unwrap();
        assert_eq!(null.summary, Some(None));

        let set: Patch = serde_json::from_str(r#"{"summary": "hi"}"#).unwrap();
        assert_eq!(set.summary, Some(Some("hi".to_string())));
    }

    #[test]
    fn test_page_params() {
        assert_eq!(PageParams::default().resolve(50, 100), (50, 0));
        let params = PageParams {
            limit: Some(500),
            offset: Some(-3),
        };
        assert_eq!(params.resolve(50, 100), (100, 0));
    }
}
