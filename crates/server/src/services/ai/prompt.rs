//! Prompt construction and answer parsing shared by both providers.

use serde::{Deserialize, Serialize};

/// Most keywords kept from an answer.
pub const MAX_KEYWORDS: usize = 5;
/// Characters of page text sent to the model.
const MAX_CONTENT_CHARS: usize = 4000;

/// What the model is asked about.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub url: String,
    pub title: String,
    pub content: Option<String>,
    /// Names of the user's existing categories.
    pub categories: Vec<String>,
    /// Preferred answer language (`ko`, `en`, ...).
    pub language: String,
}

/// The model's categorization and summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

pub(crate) fn system_prompt(language: &str) -> String {
    let language = match language {
        "ko" => "Korean",
        "ja" => "Japanese",
        _ => "English",
    };
    format!(
        "You organize saved web links. Answer with a single JSON object and nothing else: \
         {{\"summary\": string, \"keywords\": string[], \"category\": string | null}}. \
         Write the summary in {language}, at most three sentences. \
         Give at most {MAX_KEYWORDS} short keywords. \
         Choose category from the provided list when one fits, otherwise null."
    )
}

pub(crate) fn user_prompt(request: &AnalysisRequest) -> String {
    let categories = if request.categories.is_empty() {
        "(none)".to_string()
    } else {
        request.categories.join(", ")
    };
    let mut prompt = format!(
        "URL: {}\nTitle: {}\nCategories: {categories}\n",
        request.url, request.title
    );
    if let Some(content) = request.content.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        let excerpt: String = content.chars().take(MAX_CONTENT_CHARS).collect();
        prompt.push_str("Content:\n");
        prompt.push_str(&excerpt);
    }
    prompt
}

/// Parse a model answer, tolerating Markdown code fences and prose around
/// the JSON object.
///
/// # Errors
///
/// Returns a description of the problem if no JSON object with a summary is found.
pub(crate) fn parse_analysis(text: &str, categories: &[String]) -> Result<Analysis, String> {
    let start = text.find('{').ok_or("answer contains no JSON object")?;
    let end = text.rfind('}').ok_or("answer contains no JSON object")?;
    let json = text.get(start..=end).ok_or("answer contains no JSON object")?;

    let mut analysis: Analysis =
        serde_json::from_str(json).map_err(|e| format!("invalid analysis JSON: {e}"))?;

    analysis.summary = analysis.summary.trim().to_string();
    if analysis.summary.is_empty() {
        return Err("analysis has an empty summary".to_string());
    }

    let mut keywords: Vec<String> = Vec::with_capacity(MAX_KEYWORDS);
    for keyword in analysis.keywords.iter().map(|k| k.trim()) {
        if keyword.is_empty() || keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            continue;
        }
        keywords.push(keyword.to_string());
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }
    analysis.keywords = keywords;

    // Only keep a category the user actually has, spelled the way they spell it.
    analysis.category = analysis.category.and_then(|suggested| {
        categories
            .iter()
            .find(|name| name.trim().eq_ignore_ascii_case(suggested.trim()))
            .cloned()
    });

    Ok(analysis)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn categories() -> Vec<String> {
        vec!["Dev".to_string(), "Recipes".to_string()]
    }

    #[test]
    fn test_parse_plain_json() {
        let analysis = parse_analysis(
            r#"{"summary":" A talk on async Rust. ","keywords":["rust","async","Rust"],"category":"dev"}"#,
            &categories(),
        )
        .unwrap();
        assert_eq!(analysis.summary, "A talk on async Rust.");
        assert_eq!(analysis.keywords, vec!["rust", "async"]);
        assert_eq!(analysis.category.as_deref(), Some("Dev"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here you go:\n```json\n{\"summary\": \"김치찌개 레시피\", \"keywords\": [\"요리\"], \"category\": \"Travel\"}\n```";
        let analysis = parse_analysis(text, &categories()).unwrap();
        assert_eq!(analysis.summary, "김치찌개 레시피");
        assert_eq!(analysis.category, None);
    }

    #[test]
    fn test_parse_caps_keywords() {
        let text = r#"{"summary":"s","keywords":["a","b","c","d","e","f","g"]}"#;
        assert_eq!(parse_analysis(text, &[]).unwrap().keywords.len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_analysis("I cannot help with that.", &[]).is_err());
        assert!(parse_analysis(r#"{"summary": ""}"#, &[]).is_err());
        assert!(parse_analysis(r#"{"keywords": []}"#, &[]).is_err());
    }

    #[test]
    fn test_user_prompt_lists_categories() {
        let prompt = user_prompt(&AnalysisRequest {
            url: "https://github.com/tokio-rs/axum".to_string(),
            title: "axum".to_string(),
            content: Some("  ".to_string()),
            categories: categories(),
            language: "en".to_string(),
        });
        assert!(prompt.contains("Categories: Dev, Recipes"));
        assert!(!prompt.contains("Content:"));
        assert!(system_prompt("ko").contains("Korean"));
    }
}
