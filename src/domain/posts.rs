//! Blog post records as read from the document store.

use time::{
    Date, OffsetDateTime, format_description::FormatItem, format_description::well_known::Rfc3339,
    macros::format_description,
};

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const SITEMAP_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month padding:zero]-[day padding:zero]");

/// Publish time of a post, resolved by the store adapter.
///
/// The store always hands out one of the two variants; records whose
/// timestamp is missing or cannot be parsed arrive as [`Timestamp::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timestamp {
    Known(OffsetDateTime),
    #[default]
    Unknown,
}

impl Timestamp {
    /// Parse an RFC 3339 value, falling back to `Unknown` when it is malformed.
    pub fn parse_rfc3339(value: &str) -> Self {
        OffsetDateTime::parse(value.trim(), &Rfc3339)
            .map(Self::Known)
            .unwrap_or(Self::Unknown)
    }

    pub fn or_now(self, now: OffsetDateTime) -> OffsetDateTime {
        match self {
            Timestamp::Known(value) => value,
            Timestamp::Unknown => now,
        }
    }
}

/// A post document. Every field but the identifier is optional in the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostRecord {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub cover_image_url: Option<String>,
    pub publish_date: Timestamp,
}

impl PostRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

pub fn format_sitemap_date(date: Date) -> String {
    date.format(SITEMAP_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}
