//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::{CursorPage, PageRequest, PaginationError, PostCursor};
use crate::domain::posts::PostRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("malformed document `{id}`: {message}")]
    Malformed { id: String, message: String },
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn malformed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Read access to the blog post collection.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Fetch one post by document identifier.
    async fn find_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError>;

    /// List posts in store order, one page at a time.
    async fn list_posts(
        &self,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, RepoError>;
}
