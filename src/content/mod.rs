//! Content module - post documents, structured text and their display forms

mod format;
mod post;
mod reading_time;
mod rich_text;

pub use format::{format_post, format_post_list, format_post_summary};
pub use post::{Banner, ContentBlock, PostDetail, PostSummary, RawPost, RawPostData};
pub use reading_time::{estimate_reading_time, DEFAULT_WORDS_PER_MINUTE};
pub use rich_text::{as_text, RichTextNode, Span};
