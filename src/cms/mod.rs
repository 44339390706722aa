//! Headless CMS access
//!
//! [`ContentFetcher`] is the seam between page generation and the content
//! API; [`PrismicClient`] implements it over the Prismic REST API v2.

mod error;
mod prismic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::RawPost;

pub use error::{CmsError, Result};
pub use prismic::PrismicClient;

/// Page size used when walking every document of a type
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of a document query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostsPage {
    #[serde(default)]
    pub results: Vec<RawPost>,
    /// Opaque URL of the following page, `None` on the last page
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Read access to the post documents of a content repository
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// First page of documents of `doc_type`
    async fn get_by_type(&self, doc_type: &str, page_size: u32) -> Result<PostsPage>;

    /// The document of `doc_type` whose UID is `uid`
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawPost>;

    /// Follow a pagination cursor returned as `next_page`
    async fn fetch_page(&self, url: &str) -> Result<PostsPage>;

    /// Every document of `doc_type`, following all cursors
    async fn get_all_by_type(&self, doc_type: &str) -> Result<Vec<RawPost>> {
        let mut page = self.get_by_type(doc_type, MAX_PAGE_SIZE).await?;
        let mut documents = std::mem::take(&mut page.results);

        while let Some(next) = page.next_page.take() {
            page = self.fetch_page(&next).await?;
            documents.append(&mut page.results);
        }

        Ok(documents)
    }
}
