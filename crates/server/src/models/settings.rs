//! Per-user preferences, credit balances and the global admin settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkbrain_core::CategoryId;

/// Key of the single admin settings document.
pub const ADMIN_SETTINGS_KEY: &str = "adminSettings";

/// A user's credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credits {
    pub balance: i32,
    pub lifetime_earned: i32,
    pub updated_at: DateTime<Utc>,
}

/// Which LLM provider analyzes a user's clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    #[default]
    Openai,
    Gemini,
}

/// User preferences stored as a JSON document.
///
/// Unknown fields are ignored and missing ones take their defaults, so older
/// documents keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub language: String,
    pub theme: String,
    pub ai_provider: AiProviderKind,
    pub auto_categorize: bool,
    pub auto_summarize: bool,
    pub default_category_id: Option<CategoryId>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "ko".to_string(),
            theme: "system".to_string(),
            ai_provider: AiProviderKind::default(),
            auto_categorize: true,
            auto_summarize: true,
            default_category_id: None,
        }
    }
}

/// Global switches managed from the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminSettings {
    pub signups_enabled: bool,
    pub referrals_enabled: bool,
    /// Clips a user without premium access may keep; `None` is unlimited.
    pub free_clip_limit: Option<i64>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            signups_enabled: true,
            referrals_enabled: true,
            free_clip_limit: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_fill_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"theme":"dark","legacyFlag":1}"#).unwrap();
        assert_eq!(prefs.theme, "dark");
        assert_eq!(prefs.language, "ko");
        assert_eq!(prefs.ai_provider, AiProviderKind::Openai);
        assert!(prefs.auto_categorize);
    }

    #[test]
    fn test_preferences_wire_format() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["aiProvider"], "openai");
        assert_eq!(json["autoSummarize"], true);
        assert!(json["defaultCategoryId"].is_null());
    }

    #[test]
    fn test_admin_settings_defaults() {
        let settings: AdminSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AdminSettings::default());
        assert!(settings.signups_enabled);
        assert_eq!(settings.free_clip_limit, None);
    }
}
