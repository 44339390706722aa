//! List posts of the content repository

use anyhow::Result;

use crate::cms::ContentFetcher;
use crate::content::PostSummary;
use crate::helpers::DateFormatter;
use crate::listing::IncrementalListState;
use crate::Site;

/// Print the home page listing; with `all`, keep loading pages until the end
pub async fn run(site: &Site, all: bool) -> Result<()> {
    let fetcher = site.fetcher()?;
    let state = load(site, fetcher.as_ref(), all).await?;

    println!("Posts ({}):", state.len());
    for post in state.results() {
        println!("{}", format_line(post));
    }
    if let Some(next) = state.next_page() {
        println!("More posts available (next page: {})", next);
    }

    Ok(())
}

async fn load(site: &Site, fetcher: &dyn ContentFetcher, all: bool) -> Result<IncrementalListState> {
    let cms = &site.config.cms;
    let dates = DateFormatter::from_config(&site.config);
    let state =
        IncrementalListState::initial(fetcher, &cms.document_type, cms.page_size, &dates).await?;

    if all {
        Ok(state.load_all(fetcher, &dates).await?)
    } else {
        Ok(state)
    }
}

fn format_line(post: &PostSummary) -> String {
    format!(
        "  {} - {} ({}) [{}]",
        post.first_publication_date, post.title, post.author, post.uid
    )
}
