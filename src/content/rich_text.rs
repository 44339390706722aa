//! Prismic structured text

use serde::{Deserialize, Serialize};

use super::post::null_as_default;

/// A block of structured text (paragraph, heading, list item, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichTextNode {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    /// Absent on embeds and images
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub spans: Vec<Span>,
}

/// Inline formatting over a character range of a node's text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    pub data: Option<serde_json::Value>,
}

impl RichTextNode {
    /// Create a paragraph node
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.into(),
            spans: Vec::new(),
        }
    }
}

/// Render structured text as plain text, one space between nodes.
/// Nodes without text (images, embeds) are skipped.
pub fn as_text(nodes: &[RichTextNode]) -> String {
    nodes
        .iter()
        .filter(|node| !node.text.is_empty())
        .map(|node| node.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
