//! Sitemap service for sitemap.xml and robots.txt generation.
//!
//! The service walks the whole post collection page by page and keeps the
//! HTTP layer focused on request/response handling.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::histogram;
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

use crate::application::origin::RequestOrigin;
use crate::application::pagination::{PageRequest, PostCursor};
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::fields::derive_publish_date;
use crate::domain::posts::format_sitemap_date;
use crate::presentation::escape::escape_html;

pub const METRIC_SITEMAP_RENDER_TOTAL: &str = "prerender_sitemap_render_total";
pub const METRIC_SITEMAP_URLS: &str = "prerender_sitemap_urls";

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">";
const XML_FOOTER: &str = "\n</urlset>";

/// Service for generating sitemap.xml and robots.txt.
#[derive(Clone)]
pub struct SitemapService {
    posts: Arc<dyn PostsRepo>,
    page_size: u32,
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to list posts: {0}")]
    Posts(#[from] RepoError),
    #[error("store returned page token `{token}` more than once")]
    RepeatedCursor { token: String },
}

impl SitemapService {
    pub fn new(posts: Arc<dyn PostsRepo>, page_size: u32) -> Self {
        Self {
            posts,
            page_size: page_size.max(1),
        }
    }

    /// Generate sitemap.xml content for every post, in store order.
    ///
    /// Posts without a usable publish date are listed with `now` as lastmod.
    pub async fn sitemap_xml(
        &self,
        origin: &RequestOrigin,
        now: OffsetDateTime,
    ) -> Result<String, SitemapError> {
        let mut xml = String::from(XML_HEADER);
        xml.push_str(&root_entry(origin));

        let mut entries = 1usize;
        let mut cursor: Option<PostCursor> = None;
        let mut seen_tokens = HashSet::new();
        loop {
            let page = self
                .posts
                .list_posts(PageRequest::new(self.page_size, cursor.clone()))
                .await?;

            for post in &page.items {
                let published = derive_publish_date(post, now).to_offset(UtcOffset::UTC);
                let lastmod = format_sitemap_date(published.date());
                xml.push_str(&post_entry(origin, &post.id, &lastmod));
                entries += 1;
            }

            cursor = match page.next_cursor {
                Some(next) => {
                    let next = PostCursor::decode(&next).map_err(RepoError::from)?;
                    if !seen_tokens.insert(next.encode()) {
                        return Err(SitemapError::RepeatedCursor { token: next.encode() });
                    }
                    Some(next)
                }
                None => break,
            };
        }

        xml.push_str(XML_FOOTER);
        histogram!(METRIC_SITEMAP_URLS).record(entries as f64);
        Ok(xml)
    }

    /// Generate robots.txt content pointing crawlers at the sitemap.
    pub fn robots_txt(&self, origin: &RequestOrigin) -> String {
        format!(
            "User-agent: *\nAllow: /\nSitemap: {}\n",
            origin.sitemap_url()
        )
    }
}

fn root_entry(origin: &RequestOrigin) -> String {
    format!(
        "\n  <url>\n    <loc>{}</loc>\n    <changefreq>daily</changefreq>\n    <priority>1.0</priority>\n  </url>",
        escape_html(&origin.root_url())
    )
}

fn post_entry(origin: &RequestOrigin, id: &str, lastmod: &str) -> String {
    format!(
        "\n  <url>\n    <loc>{}</loc>\n    <lastmod>{lastmod}</lastmod>\n    <changefreq>weekly</changefreq>\n    <priority>0.80</priority>\n  </url>",
        escape_html(&origin.post_url(id))
    )
}
