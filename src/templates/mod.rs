//! Built-in templates using the Tera template engine
//!
//! Templates are embedded in the binary; the generator and the server
//! render them with the view structs defined here.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{as_text, estimate_reading_time, PostDetail};

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetravelling/layout.html")),
            ("index.html", include_str!("spacetravelling/index.html")),
            ("post.html", include_str!("spacetravelling/post.html")),
            ("fallback.html", include_str!("spacetravelling/fallback.html")),
            ("not_found.html", include_str!("spacetravelling/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetravelling/partials/header.html"),
            ),
            (
                "partials/icon_calendar.html",
                include_str!("spacetravelling/partials/icon_calendar.html"),
            ),
            (
                "partials/icon_user.html",
                include_str!("spacetravelling/partials/icon_user.html"),
            ),
            (
                "partials/icon_clock.html",
                include_str!("spacetravelling/partials/icon_clock.html"),
            ),
        ])?;

        tera.register_filter("reading_time_label", reading_time_label_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: `3` -> `3 min`
fn reading_time_label_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let minutes = tera::try_get_value!("reading_time_label", "value", u64, value);
    Ok(tera::Value::String(format!("{} min", minutes)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub url: String,
    pub logo: String,
    pub language: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            url: config.url.clone(),
            logo: config.logo.clone(),
            language: config.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelData {
    pub load_more: String,
    pub load_more_error: String,
    pub loading: String,
}

impl LabelData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            load_more: config.load_more_text.clone(),
            load_more_error: config.load_more_error_text.clone(),
            loading: config.loading_text.clone(),
        }
    }
}

/// One section of a post with its body flattened to plain text
#[derive(Debug, Clone, Serialize)]
pub struct BlockData {
    pub heading: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub first_publication_date: String,
    pub datetime: String,
    pub banner_url: String,
    pub reading_time: u32,
    pub content: Vec<BlockData>,
}

impl PostPageData {
    pub fn new(post: &PostDetail, words_per_minute: u32) -> Self {
        Self {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            first_publication_date: post.first_publication_date.clone(),
            datetime: post.datetime.clone(),
            banner_url: post.banner.url.clone(),
            reading_time: estimate_reading_time(&post.content, words_per_minute),
            content: post
                .content
                .iter()
                .map(|block| BlockData {
                    heading: block.heading.clone(),
                    text: as_text(&block.body),
                })
                .collect(),
        }
    }
}
