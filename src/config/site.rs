//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::content::DEFAULT_WORDS_PER_MINUTE;

/// Environment variable overriding `cms.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub url: String,
    pub logo: String,
    pub language: String,
    pub timezone: String,

    // Directory
    pub source_dir: String,
    pub public_dir: String,

    // Content API
    #[serde(default)]
    pub cms: CmsConfig,

    // Formatting
    pub date_format: String,
    pub reading_speed: u32,

    // Regeneration
    #[serde(default)]
    pub revalidate: RevalidateConfig,

    // Labels
    pub load_more_text: String,
    pub loading_text: String,
    pub load_more_error_text: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetravelling".to_string(),
            description: String::new(),
            url: "http://localhost:4000".to_string(),
            logo: "/logo.svg".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            source_dir: "source".to_string(),
            public_dir: "public".to_string(),

            cms: CmsConfig::default(),

            date_format: "dd MMM yyyy".to_string(),
            reading_speed: DEFAULT_WORDS_PER_MINUTE,

            revalidate: RevalidateConfig::default(),

            load_more_text: "Carregar mais posts".to_string(),
            loading_text: "Carregando...".to_string(),
            load_more_error_text: "Não foi possível carregar mais posts.".to_string(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
            tracing::debug!("Using CMS endpoint from {}", ENDPOINT_ENV);
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.cms.access_token = Some(token);
        }
    }

    /// Parse the configured timezone, falling back to UTC
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                chrono_tz::UTC
            }
        }
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API v2 root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding blog posts
    pub document_type: String,
    /// Posts per listing page
    pub page_size: u32,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            timeout: 10,
        }
    }
}

/// Seconds after which a generated page is considered stale
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    pub index: u64,
    pub post: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            index: 60 * 60 * 60,
            post: 60 * 60,
        }
    }
}
