//! LLM-backed clip analysis.
//!
//! The caller's provider API key arrives with each request and is only held
//! for the duration of that call.

pub mod error;
pub mod gemini;
pub mod openai;
pub mod prompt;

use secrecy::SecretString;

pub use error::AiError;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use prompt::{Analysis, AnalysisRequest};

use crate::config::AiConfig;
use crate::models::settings::AiProviderKind;

/// Both provider clients, sharing one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct AiClients {
    openai: OpenAiClient,
    gemini: GeminiClient,
}

impl AiClients {
    #[must_use]
    pub fn new(http: &reqwest::Client, config: &AiConfig) -> Self {
        Self {
            openai: OpenAiClient::new(http.clone(), &config.openai_base_url, &config.openai_model),
            gemini: GeminiClient::new(http.clone(), &config.gemini_base_url, &config.gemini_model),
        }
    }

    /// Analyze a link with the chosen provider.
    ///
    /// # Errors
    ///
    /// Returns `AiError` if the provider call fails or its answer is unusable.
    pub async fn analyze(
        &self,
        provider: AiProviderKind,
        api_key: &SecretString,
        request: &AnalysisRequest,
    ) -> Result<Analysis, AiError> {
        let result = match provider {
            AiProviderKind::Openai => self.openai.analyze(api_key, request).await,
            AiProviderKind::Gemini => self.gemini.analyze(api_key, request).await,
        };
        if let Err(ref e) = result {
            tracing::warn!(?provider, error = %e, "Clip analysis failed");
        }
        result
    }
}
