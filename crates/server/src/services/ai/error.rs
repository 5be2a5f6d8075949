//! Error types for the LLM clients.

use thiserror::Error;

/// Errors that can occur when calling an LLM provider.
#[derive(Debug, Error)]
pub enum AiError {
    /// The caller did not supply a provider API key.
    #[error("An AI provider API key is required (X-AI-Api-Key header)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the key.
    #[error("unauthorized: provider rejected the API key")]
    Unauthorized,

    #[error("rate limited by provider")]
    RateLimited,

    /// Provider returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Provider answered, but not with the JSON we asked for.
    #[error("parse error: {0}")]
    Parse(String),
}

impl AiError {
    /// Map a non-success response to an error, reading the body for context.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Self::Unauthorized;
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Self::RateLimited;
        }
        match response.text().await {
            Ok(body) => Self::Api {
                status: status.as_u16(),
                message: extract_error_message(&body).unwrap_or(body),
            },
            Err(e) => Self::Http(e),
        }
    }
}

/// Both providers wrap errors as `{"error": {"message": "..."}}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Incorrect API key provided")
        );
        assert_eq!(extract_error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_ai_error_display() {
        let err = AiError::Api {
            status: 400,
            message: "model not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error (400): model not found");
    }
}
