//! Gemini `generateContent` client.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::AiError;
use super::prompt::{Analysis, AnalysisRequest, parse_analysis, system_prompt, user_prompt};

const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiClient {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Ask the model to summarize and categorize a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the provider rejects it, or the
    /// answer is not the expected JSON.
    #[instrument(skip(self, api_key, request), fields(model = %self.model))]
    pub async fn analyze(
        &self,
        api_key: &SecretString,
        request: &AnalysisRequest,
    ) -> Result<Analysis, AiError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user_prompt(request),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt(&request.language),
                }],
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::from_response(response).await);
        }

        let text = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))?;
        let content = answer_text(parsed)?;

        parse_analysis(&content, &request.categories).map_err(AiError::Parse)
    }
}

fn answer_text(response: GenerateResponse) -> Result<String, AiError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .map(|candidate| {
            candidate
                .content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::Parse("response has no candidate text".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            url: "https://www.youtube.com/watch?v=rustconf".to_string(),
            title: "RustConf keynote".to_string(),
            content: None,
            categories: vec!["Reading".to_string(), "Talks".to_string()],
            language: "en".to_string(),
        }
    }

    fn expected() -> Analysis {
        Analysis {
            summary: "A keynote about Rust.".to_string(),
            keywords: vec!["rust".to_string(), "keynote".to_string()],
            category: Some("Talks".to_string()),
        }
    }

    /// Fenced answer with a lower-case category and a duplicate keyword.
    const ANSWER: &str = "```json\n{\"summary\": \" A keynote about Rust. \", \"keywords\": [\"rust\", \"Rust\", \"keynote\"], \"category\": \"talks\"}\n```";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(
            reqwest::Client::new(),
            &format!("{}/v1beta", server.uri()),
            "gemini-1.5-flash",
        )
    }

    #[test]
    fn test_answer_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"summary\":"},{"text":"\"x\"}"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(answer_text(response).unwrap(), r#"{"summary":"x"}"#);
    }

    #[test]
    fn test_blocked_response_is_an_error() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(answer_text(response), Err(AiError::Parse(_))));
    }

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: Vec::new(),
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: "sys".to_string(),
                }],
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: "application/json",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[tokio::test]
    async fn test_analyze_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-test"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": ANSWER }] },
                    "finishReason": "STOP",
                }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = client_for(&server)
            .analyze(&SecretString::from("g-test"), &request())
            .await
            .unwrap();
        assert_eq!(analysis, expected());
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" },
            })))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .analyze(&SecretString::from("g-test"), &request())
            .await;
        assert!(matches!(result, Err(AiError::RateLimited)));
    }

    #[tokio::test]
    async fn test_forbidden_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .analyze(&SecretString::from("g-test"), &request())
            .await;
        assert!(matches!(result, Err(AiError::Unauthorized)));
    }
}
