//! Generator module - renders pages from CMS content into the public directory

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tera::Context;
use walkdir::WalkDir;

use crate::cms::{CmsError, ContentFetcher};
use crate::content::{format_post, RawPost};
use crate::helpers::DateFormatter;
use crate::listing::IncrementalListState;
use crate::templates::{LabelData, PostPageData, SiteData, TemplateRenderer};
use crate::Site;

/// Route of the load-more JSON endpoint served by `server`
pub const LOAD_MORE_ENDPOINT: &str = "/api/posts";

/// What a full generation produced
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    pub listed: usize,
    pub posts: usize,
    pub assets: usize,
}

/// Renders the listing and post pages
pub struct Generator {
    site: Site,
    fetcher: Arc<dyn ContentFetcher>,
    renderer: TemplateRenderer,
    dates: DateFormatter,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site, fetcher: Arc<dyn ContentFetcher>) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let dates = DateFormatter::from_config(&site.config);

        Ok(Self {
            site: site.clone(),
            fetcher,
            renderer,
            dates,
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn fetcher(&self) -> &dyn ContentFetcher {
        self.fetcher.as_ref()
    }

    pub fn dates(&self) -> &DateFormatter {
        &self.dates
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.site.public_dir)?;

        let assets = self.copy_source_assets()?;
        let listed = self.generate_index().await?;

        let documents = self
            .fetcher
            .get_all_by_type(&self.site.config.cms.document_type)
            .await?;
        tracing::info!("Fetched {} posts", documents.len());

        let mut posts = 0;
        for raw in &documents {
            let Some(uid) = raw.uid.as_deref() else {
                tracing::warn!("Skipping post without UID: {:?}", raw.data.title);
                continue;
            };
            if !is_valid_uid(uid) {
                tracing::warn!("Skipping post with unsafe UID {:?}", uid);
                continue;
            }
            self.write_post(uid, raw)?;
            posts += 1;
        }

        self.write(self.site.public_dir.join("404.html"), &self.render_not_found()?)?;

        Ok(GenerateReport {
            listed,
            posts,
            assets,
        })
    }

    /// Generate `index.html` from the first listing page; returns the number of posts listed
    pub async fn generate_index(&self) -> Result<usize> {
        let cms = &self.site.config.cms;
        let state = IncrementalListState::initial(
            self.fetcher.as_ref(),
            &cms.document_type,
            cms.page_size,
            &self.dates,
        )
        .await?;

        let html = self.render_index(&state)?;
        self.write(self.index_output_path(), &html)?;
        Ok(state.len())
    }

    /// Fetch one post by UID and generate its page
    pub async fn generate_post(&self, uid: &str) -> Result<PathBuf> {
        if !is_valid_uid(uid) {
            bail!(CmsError::NotFound {
                doc_type: self.site.config.cms.document_type.clone(),
                uid: uid.to_string(),
            });
        }
        let raw = self
            .fetcher
            .get_by_uid(&self.site.config.cms.document_type, uid)
            .await?;
        self.write_post(uid, &raw)
    }

    pub fn render_index(&self, state: &IncrementalListState) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("posts", state.results());
        context.insert("next_page", &state.next_page());
        context.insert("load_more_endpoint", LOAD_MORE_ENDPOINT);
        self.renderer.render("index.html", &context)
    }

    pub fn render_post(&self, raw: &RawPost) -> Result<String> {
        let detail = format_post(raw, &self.dates);
        let mut context = self.create_base_context();
        context.insert(
            "post",
            &PostPageData::new(&detail, self.site.config.reading_speed),
        );
        self.renderer.render("post.html", &context)
    }

    /// "Loading" page shown while a post is generated on demand
    pub fn render_fallback(&self, retry_after: u64) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("retry_after", &retry_after);
        self.renderer.render("fallback.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        let context = self.create_base_context();
        self.renderer.render("not_found.html", &context)
    }

    pub fn index_output_path(&self) -> PathBuf {
        self.site.public_dir.join("index.html")
    }

    pub fn post_output_path(&self, uid: &str) -> PathBuf {
        self.site
            .public_dir
            .join("post")
            .join(uid)
            .join("index.html")
    }

    fn write_post(&self, uid: &str, raw: &RawPost) -> Result<PathBuf> {
        let html = self.render_post(raw)?;
        let output_path = self.post_output_path(uid);
        self.write(output_path.clone(), &html)?;
        Ok(output_path)
    }

    /// Create a base context with common variables
    fn create_base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(&self.site.config));
        context.insert("labels", &LabelData::from_config(&self.site.config));
        context
    }

    fn write(&self, output_path: PathBuf, html: &str) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Copy static files (logo, images, ...) from the source directory
    fn copy_source_assets(&self) -> Result<usize> {
        copy_dir(&self.site.source_dir, &self.site.public_dir)
    }
}

/// UIDs become directory names; only slug characters are allowed
pub fn is_valid_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn copy_dir(source_dir: &Path, target_dir: &Path) -> Result<usize> {
    if !source_dir.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(source_dir)?;
        let dest = target_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{post, MemoryFetcher};
    use crate::content::{ContentBlock, RichTextNode};

    fn site(dir: &Path) -> Site {
        let mut site = Site::new(dir).unwrap();
        site.config.timezone = "UTC".to_string();
        site
    }

    fn fetcher() -> Arc<MemoryFetcher> {
        let mut first = post("como-utilizar-hooks");
        first.data.content = vec![ContentBlock {
            heading: "Proin et varius".to_string(),
            body: vec![RichTextNode::paragraph("Nullam dolor sapien")],
        }];
        Arc::new(MemoryFetcher::new(vec![
            vec![first],
            vec![post("criando-um-app-cra-do-zero")],
        ]))
    }

    #[tokio::test]
    async fn test_generate_site() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        fs::create_dir_all(&site.source_dir).unwrap();
        fs::write(site.source_dir.join("logo.svg"), "<svg/>").unwrap();

        let generator = Generator::new(&site, fetcher()).unwrap();
        let report = generator.generate().await.unwrap();
        assert_eq!(report.listed, 1);
        assert_eq!(report.posts, 2);
        assert_eq!(report.assets, 1);

        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("Post como-utilizar-hooks"));
        assert!(!index.contains("Post criando-um-app-cra-do-zero"));
        assert!(index.contains("Carregar mais posts"));

        let post_html = fs::read_to_string(
            site.public_dir
                .join("post/como-utilizar-hooks/index.html"),
        )
        .unwrap();
        assert!(post_html.contains("Proin et varius"));
        assert!(post_html.contains("Nullam dolor sapien"));
        assert!(post_html.contains("25 mar 2021"));
        assert!(post_html.contains("1 min"));

        assert!(site
            .public_dir
            .join("post/criando-um-app-cra-do-zero/index.html")
            .exists());
        assert!(site.public_dir.join("logo.svg").exists());
        assert!(site.public_dir.join("404.html").exists());
    }

    #[tokio::test]
    async fn test_generate_post_unknown_uid() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path()), fetcher()).unwrap();

        let err = generator.generate_post("missing").await.unwrap_err();
        let cms = err.downcast_ref::<CmsError>().unwrap();
        assert!(cms.is_not_found());
    }

    #[tokio::test]
    async fn test_generate_post_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path()), fetcher()).unwrap();

        let err = generator.generate_post("../secret").await.unwrap_err();
        assert!(err.downcast_ref::<CmsError>().unwrap().is_not_found());
        assert!(!dir.path().join("secret").exists());
    }

    #[test]
    fn test_is_valid_uid() {
        assert!(is_valid_uid("como-utilizar-hooks"));
        assert!(is_valid_uid("post_2"));
        assert!(!is_valid_uid(""));
        assert!(!is_valid_uid("../etc"));
        assert!(!is_valid_uid("a/b"));
    }
}
