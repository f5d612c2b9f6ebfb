use askama::{Error as AskamaError, Template};
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use time::{UtcOffset, format_description::well_known::Rfc3339};

use crate::application::error::{HttpError, POST_FAILURE_MESSAGE};
use crate::application::post_page::PostPage;
use crate::domain::posts::format_human_date;
use crate::domain::site::{AUTHOR_NAME, ROBOTS_DIRECTIVE, SITE_NAME};
use crate::presentation::escape::{HtmlSafe, escape_html, escape_html_with_line_breaks};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("failed to serialise structured data")]
    StructuredData(#[from] serde_json::Error),
    #[error("failed to format publish date")]
    DateFormat(#[from] time::error::Format),
    #[error("failed to render template")]
    Template(#[from] AskamaError),
}

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: ViewError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: ViewError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

/// Render the complete post document.
pub fn render_post_page(page: &PostPage) -> Result<String, TemplateRenderError> {
    let into_render_error = |error: ViewError| {
        TemplateRenderError::new(
            "presentation::views::render_post_page",
            POST_FAILURE_MESSAGE,
            error,
        )
    };

    let view = PostPageView::from_page(page).map_err(into_render_error)?;
    PostTemplate { view }
        .render()
        .map_err(|err| into_render_error(err.into()))
}

/// Escaped values interpolated into `post.html`.
#[derive(Debug, Clone)]
pub struct PostPageView {
    pub title: HtmlSafe,
    pub description: HtmlSafe,
    pub robots: HtmlSafe,
    pub canonical_url: HtmlSafe,
    pub image_url: HtmlSafe,
    pub structured_data: HtmlSafe,
    pub published_on: HtmlSafe,
    pub body: HtmlSafe,
}

impl PostPageView {
    pub fn from_page(page: &PostPage) -> Result<Self, ViewError> {
        let published_utc = page.publish_date.to_offset(UtcOffset::UTC);
        let published_iso = published_utc.format(&Rfc3339)?;
        let structured_data = structured_data(page, &published_iso)?;

        Ok(Self {
            title: escape_html(&page.title),
            description: escape_html(&page.description),
            robots: HtmlSafe::trusted(ROBOTS_DIRECTIVE),
            canonical_url: escape_html(&page.canonical_url),
            image_url: escape_html(&page.image_url),
            structured_data,
            published_on: escape_html(&format_human_date(published_utc.date())),
            body: escape_html_with_line_breaks(&page.content),
        })
    }
}

#[derive(Template)]
#[template(path = "post.html", escape = "none")]
pub struct PostTemplate {
    pub view: PostPageView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlogPosting<'a> {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    main_entity_of_page: Thing<'a>,
    headline: &'a str,
    description: &'a str,
    image: &'a str,
    author: Thing<'static>,
    publisher: Thing<'static>,
    date_published: &'a str,
}

#[derive(Serialize)]
struct Thing<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// JSON-LD payload, safe to place inside a `<script>` element.
fn structured_data(page: &PostPage, published_iso: &str) -> Result<HtmlSafe, serde_json::Error> {
    let posting = BlogPosting {
        context: "https://schema.org",
        kind: "BlogPosting",
        main_entity_of_page: Thing {
            kind: "WebPage",
            id: Some(&page.canonical_url),
            name: None,
        },
        headline: &page.title,
        description: &page.description,
        image: &page.image_url,
        author: Thing {
            kind: "Person",
            id: None,
            name: Some(AUTHOR_NAME),
        },
        publisher: Thing {
            kind: "Organization",
            id: None,
            name: Some(SITE_NAME),
        },
        date_published: published_iso,
    };

    let json = serde_json::to_string(&posting)?;
    Ok(HtmlSafe::trusted(escape_script_json(&json)))
}

fn escape_script_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            other => escaped.push(other),
        }
    }
    escaped
}
