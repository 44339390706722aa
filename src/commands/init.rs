//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# spacetravelling configuration

# Site
title: spacetravelling
description: ''
url: http://localhost:4000
logo: /logo.svg
language: pt-BR
timezone: America/Sao_Paulo

# Directory
source_dir: source
public_dir: public

# Content API (PRISMIC_API_ENDPOINT / PRISMIC_ACCESS_TOKEN override these)
cms:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  page_size: 1
  timeout: 10

# Formatting
date_format: dd MMM yyyy
reading_speed: 200

# Seconds before a generated page is rebuilt by the server
revalidate:
  index: 216000
  post: 3600

# Labels
load_more_text: Carregar mais posts
loading_text: Carregando...
load_more_error_text: Não foi possível carregar mais posts.
"#;

const DEFAULT_LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="240" height="26" viewBox="0 0 240 26"><text x="0" y="20" font-family="Inter, sans-serif" font-size="22" font-weight="700" fill="#ff57b2">spacetravelling<tspan fill="#f8f8f8">.</tspan></text></svg>
"##;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir.join("source"))?;
    fs::write(&config_path, DEFAULT_CONFIG)?;

    let logo_path = target_dir.join("source/logo.svg");
    if !logo_path.exists() {
        fs::write(&logo_path, DEFAULT_LOGO)?;
    }

    tracing::debug!("Wrote {:?}", config_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_init_site() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();

        let config = SiteConfig::load(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.cms.document_type, "posts");
        assert_eq!(config.cms.access_token, None);
        assert_eq!(config.revalidate.index, 216_000);
        assert_eq!(config.load_more_error_text, SiteConfig::default().load_more_error_text);
        assert_eq!(config.loading_text, "Carregando...");
        assert!(dir.path().join("source/logo.svg").exists());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();
        assert!(init_site(dir.path()).is_err());
    }
}
