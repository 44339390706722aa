//! Post models: raw CMS documents and their display forms

use serde::{Deserialize, Deserializer, Serialize};

use super::rich_text::RichTextNode;

/// A post document as returned by the content API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPost {
    /// Document UID (URL slug)
    #[serde(default)]
    pub uid: Option<String>,

    /// ISO 8601 timestamp, e.g. `2021-03-25T19:25:28+0000`
    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub data: RawPostData,
}

/// The `data` payload of a post document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPostData {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub banner: Banner,
    #[serde(deserialize_with = "null_as_default")]
    pub content: Vec<ContentBlock>,
}

/// Banner image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

/// One section of a post: a heading followed by rich text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentBlock {
    #[serde(deserialize_with = "null_as_default")]
    pub heading: String,
    #[serde(deserialize_with = "null_as_default")]
    pub body: Vec<RichTextNode>,
}

/// Post fields shown on the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    /// Localized display date
    pub first_publication_date: String,
    /// Machine-readable date for `<time datetime>`
    pub datetime: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// Post fields shown on the detail page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: String,
    pub datetime: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,
    pub content: Vec<ContentBlock>,
}

/// Prismic sends `null` for empty fields
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
