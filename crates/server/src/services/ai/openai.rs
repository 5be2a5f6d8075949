//! `OpenAI` chat completions client.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::AiError;
use super::prompt::{Analysis, AnalysisRequest, parse_analysis, system_prompt, user_prompt};

const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
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
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(&request.language),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::from_response(response).await);
        }

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))?;
        let content = answer_text(parsed)?;

        parse_analysis(&content, &request.categories).map_err(AiError::Parse)
    }
}

fn answer_text(response: ChatResponse) -> Result<String, AiError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AiError::Parse("response has no message content".to_string()))
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

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(reqwest::Client::new(), &format!("{}/v1/", server.uri()), "gpt-4o-mini")
    }

    #[test]
    fn test_answer_text() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"id":"chatcmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"{\"summary\":\"x\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(answer_text(response).unwrap(), r#"{"summary":"x"}"#);

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(answer_text(empty), Err(AiError::Parse(_))));
    }

    #[test]
    fn test_request_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".to_string(),
            }],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_analyze_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": { "type": "json_object" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": ANSWER } }],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = client_for(&server)
            .analyze(&SecretString::from("sk-test"), &request())
            .await
            .unwrap();
        assert_eq!(analysis, expected());
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "Rate limit reached" },
            })))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .analyze(&SecretString::from("sk-test"), &request())
            .await;
        assert!(matches!(result, Err(AiError::RateLimited)));
    }

    #[tokio::test]
    async fn test_rejected_key_and_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-revoked"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "The server had an error" },
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let rejected = client
            .analyze(&SecretString::from("sk-revoked"), &request())
            .await;
        assert!(matches!(rejected, Err(AiError::Unauthorized)));

        let failed = client.analyze(&SecretString::from("sk-test"), &request()).await;
        match failed {
            Err(AiError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "The server had an error");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
