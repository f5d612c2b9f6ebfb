//! Cursor-based pagination primitives shared by the store adapters.

use serde::Serialize;
use thiserror::Error;

/// Continuation token for the post listing.
///
/// The store issues the token; this crate never inspects it beyond rejecting
/// blank values, so the same type works for any backend that pages by token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCursor(String);

impl PostCursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn encode(&self) -> String {
        self.0.clone()
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let trimmed = cursor.trim();
        if trimmed.is_empty() {
            return Err(PaginationError::InvalidCursor(
                "continuation token is blank".to_string(),
            ));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(PaginationError::InvalidCursor(
                "continuation token contains control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_keeps_store_token_verbatim() {
        let cursor = PostCursor::decode("AFTj2Xm_w-x=").expect("decoded cursor");
        assert_eq!(cursor.as_str(), "AFTj2Xm_w-x=");
        assert_eq!(cursor.encode(), "AFTj2Xm_w-x=");
    }

    #[test]
    fn decoding_blank_cursor_reports_error() {
        let err = PostCursor::decode("   ").expect_err("blank cursor rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));

        let err = PostCursor::decode("abc\ndef").expect_err("control characters rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
    }

    #[test]
    fn empty_page_has_no_continuation() {
        let page: CursorPage<u8> = CursorPage::empty();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
