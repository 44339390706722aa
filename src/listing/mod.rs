//! Incrementally loaded post listing
//!
//! The home page starts from the first page of posts and appends further
//! pages on demand by following the `next_page` cursor. The state is an
//! owned value: [`IncrementalListState::load_more`] borrows it and returns
//! the next state, so a failed fetch leaves the current one untouched.

use serde::{Deserialize, Serialize};

use crate::cms::{ContentFetcher, Result};
use crate::content::{format_post_list, PostSummary};
use crate::helpers::DateFormatter;

/// Posts shown so far plus the cursor of the next page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementalListState {
    results: Vec<PostSummary>,
    next_page: Option<String>,
}

impl IncrementalListState {
    pub fn new(results: Vec<PostSummary>, next_page: Option<String>) -> Self {
        Self { results, next_page }
    }

    /// A state holding only a cursor, used to serve one page at a time
    pub fn from_cursor(cursor: impl Into<String>) -> Self {
        Self::new(Vec::new(), Some(cursor.into()))
    }

    /// Fetch the first page of `doc_type`
    pub async fn initial<F>(
        fetcher: &F,
        doc_type: &str,
        page_size: u32,
        dates: &DateFormatter,
    ) -> Result<Self>
    where
        F: ContentFetcher + ?Sized,
    {
        let page = fetcher.get_by_type(doc_type, page_size).await?;
        Ok(Self::new(
            format_post_list(&page.results, dates),
            page.next_page,
        ))
    }

    pub fn results(&self) -> &[PostSummary] {
        &self.results
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_parts(self) -> (Vec<PostSummary>, Option<String>) {
        (self.results, self.next_page)
    }

    /// Append a fetched page and move the cursor. No deduplication by UID.
    pub fn apply_page(&self, posts: Vec<PostSummary>, next_page: Option<String>) -> Self {
        let mut results = Vec::with_capacity(self.results.len() + posts.len());
        results.extend_from_slice(&self.results);
        results.extend(posts);
        Self { results, next_page }
    }

    /// Fetch the page behind the cursor and return the extended state.
    /// Without a cursor nothing is fetched and an equal state is returned.
    pub async fn load_more<F>(&self, fetcher: &F, dates: &DateFormatter) -> Result<Self>
    where
        F: ContentFetcher + ?Sized,
    {
        let Some(cursor) = self.next_page.as_deref() else {
            return Ok(self.clone());
        };

        match fetcher.fetch_page(cursor).await {
            Ok(page) => {
                let posts = format_post_list(&page.results, dates);
                tracing::debug!(
                    "Loaded {} more posts (has more: {})",
                    posts.len(),
                    page.next_page.is_some()
                );
                Ok(self.apply_page(posts, page.next_page))
            }
            Err(e) => {
                tracing::warn!("Failed to load more posts: {}", e);
                Err(e)
            }
        }
    }

    /// Keep loading until the cursor runs out
    pub async fn load_all<F>(&self, fetcher: &F, dates: &DateFormatter) -> Result<Self>
    where
        F: ContentFetcher + ?Sized,
    {
        let mut state = self.clone();
        while state.has_more() {
            state = state.load_more(fetcher, dates).await?;
        }
        Ok(state)
    }
}
