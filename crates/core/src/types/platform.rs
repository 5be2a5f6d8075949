//! Source platform of a saved link.

use serde::{Deserialize, Serialize};
use url::Url;

/// Where a clip's URL points, derived from its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "clip_platform", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Instagram,
    Twitter,
    Tiktok,
    Threads,
    Facebook,
    Linkedin,
    Github,
    Medium,
    NaverBlog,
    Brunch,
    #[default]
    Web,
}

/// Host suffixes checked in order; first match wins.
const HOST_RULES: &[(&str, Platform)] = &[
    ("youtube.com", Platform::Youtube),
    ("youtu.be", Platform::Youtube),
    ("instagram.com", Platform::Instagram),
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter),
    ("tiktok.com", Platform::Tiktok),
    ("threads.net", Platform::Threads),
    ("threads.com", Platform::Threads),
    ("facebook.com", Platform::Facebook),
    ("fb.watch", Platform::Facebook),
    ("linkedin.com", Platform::Linkedin),
    ("github.com", Platform::Github),
    ("medium.com", Platform::Medium),
    ("blog.naver.com", Platform::NaverBlog),
    ("brunch.co.kr", Platform::Brunch),
];

impl Platform {
    /// Detect the platform from a URL string.
    ///
    /// Unparseable URLs and unknown hosts are [`Platform::Web`].
    #[must_use]
    pub fn detect(url: &str) -> Self {
        Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .map_or(Self::Web, |host| Self::from_host(&host))
    }

    fn from_host(host: &str) -> Self {
        let host = host.strip_prefix("www.").unwrap_or(host);
        HOST_RULES
            .iter()
            .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{suffix}")))
            .map_or(Self::Web, |(_, platform)| *platform)
    }

    /// Stable lowercase identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
            Self::Tiktok => "tiktok",
            Self::Threads => "threads",
            Self::Facebook => "facebook",
            Self::Linkedin => "linkedin",
            Self::Github => "github",
            Self::Medium => "medium",
            Self::NaverBlog => "naver_blog",
            Self::Brunch => "brunch",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
