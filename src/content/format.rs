//! Narrow raw CMS documents to the fields each page displays

use super::post::{PostDetail, PostSummary, RawPost};
use crate::helpers::{date_xml, parse_cms_date, DateFormatter};

/// Format a document for the listing page
pub fn format_post_summary(raw: &RawPost, dates: &DateFormatter) -> PostSummary {
    let (first_publication_date, datetime) = publication_dates(raw, dates);
    PostSummary {
        uid: raw.uid.clone().unwrap_or_default(),
        first_publication_date,
        datetime,
        title: raw.data.title.clone(),
        subtitle: raw.data.subtitle.clone(),
        author: raw.data.author.clone(),
    }
}

/// Format every document of a listing page, keeping fetch order
pub fn format_post_list(raws: &[RawPost], dates: &DateFormatter) -> Vec<PostSummary> {
    raws.iter()
        .map(|raw| format_post_summary(raw, dates))
        .collect()
}

/// Format a document for its detail page
pub fn format_post(raw: &RawPost, dates: &DateFormatter) -> PostDetail {
    let (first_publication_date, datetime) = publication_dates(raw, dates);
    PostDetail {
        uid: raw.uid.clone().unwrap_or_default(),
        first_publication_date,
        datetime,
        title: raw.data.title.clone(),
        subtitle: raw.data.subtitle.clone(),
        author: raw.data.author.clone(),
        banner: raw.data.banner.clone(),
        content: raw.data.content.to_vec(),
    }
}

/// (display date, ISO date); both empty when the document was never published
fn publication_dates(raw: &RawPost, dates: &DateFormatter) -> (String, String) {
    match raw.first_publication_date.as_deref() {
        Some(value) => (
            dates.format_raw(value),
            parse_cms_date(value)
                .map(|d| date_xml(&d))
                .unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    }
}
