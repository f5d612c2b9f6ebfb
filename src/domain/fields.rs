//! Display fields derived from partially populated post records.
//!
//! Every function here is total: a record with no optional fields at all still
//! yields a non-empty title, description, image URL and publish date. Missing,
//! empty and whitespace-only values are all treated as absent.

use time::OffsetDateTime;

use crate::domain::posts::PostRecord;
use crate::domain::site::{
    FALLBACK_DESCRIPTION, NON_PUBLIC_IMAGE_SCHEMES, PLACEHOLDER_IMAGE_URL, UNTITLED_POST,
};

/// Maximum number of content characters used when a description is synthesised.
pub const DESCRIPTION_EXCERPT_CHARS: usize = 160;
pub const EXCERPT_SUFFIX: &str = "...";

pub fn derive_title(post: &PostRecord) -> String {
    present(post.title.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| UNTITLED_POST.to_string())
}

pub fn derive_description(post: &PostRecord) -> String {
    if let Some(description) = present(post.description.as_deref()) {
        return description.to_string();
    }

    if let Some(content) = post
        .content
        .as_deref()
        .filter(|content| !content.trim().is_empty())
    {
        let mut excerpt: String = content.chars().take(DESCRIPTION_EXCERPT_CHARS).collect();
        excerpt.push_str(EXCERPT_SUFFIX);
        return excerpt;
    }

    FALLBACK_DESCRIPTION.to_string()
}

pub fn resolve_image_url(post: &PostRecord) -> String {
    match present(post.cover_image_url.as_deref()) {
        Some(url) if !is_non_public_reference(url) => url.to_string(),
        _ => PLACEHOLDER_IMAGE_URL.to_string(),
    }
}

pub fn derive_publish_date(post: &PostRecord, now: OffsetDateTime) -> OffsetDateTime {
    post.publish_date.or_now(now)
}

fn is_non_public_reference(url: &str) -> bool {
    NON_PUBLIC_IMAGE_SCHEMES.iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Trimmed value, or `None` when the field is missing or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}
