//! Post page service: resolves one post and its display fields.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::origin::RequestOrigin;
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::fields::{
    derive_description, derive_publish_date, derive_title, resolve_image_url,
};

pub const METRIC_POST_RENDER_TOTAL: &str = "prerender_post_render_total";

#[derive(Debug, Error)]
pub enum PostPageError {
    #[error("post `{id}` was not found")]
    NotFound { id: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Every field the post template needs, with fallbacks already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPage {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub publish_date: OffsetDateTime,
    pub canonical_url: String,
    pub content: String,
}

#[derive(Clone)]
pub struct PostPageService {
    posts: Arc<dyn PostsRepo>,
}

impl PostPageService {
    pub fn new(posts: Arc<dyn PostsRepo>) -> Self {
        Self { posts }
    }

    pub async fn load(
        &self,
        id: &str,
        origin: &RequestOrigin,
        now: OffsetDateTime,
    ) -> Result<PostPage, PostPageError> {
        let Some(post) = self.posts.find_post(id).await? else {
            debug!(target = "prerender::application::post_page", post_id = id, "post not found");
            return Err(PostPageError::NotFound { id: id.to_string() });
        };

        Ok(PostPage {
            title: derive_title(&post),
            description: derive_description(&post),
            image_url: resolve_image_url(&post),
            publish_date: derive_publish_date(&post, now),
            canonical_url: origin.post_url(&post.id),
            content: post.content.unwrap_or_default(),
            id: post.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::application::pagination::{CursorPage, PageRequest, PostCursor};
    use crate::domain::posts::PostRecord;
    use crate::domain::site::{FALLBACK_DESCRIPTION, PLACEHOLDER_IMAGE_URL, UNTITLED_POST};

    struct SingleRepo(Option<PostRecord>);

    #[async_trait]
    impl PostsRepo for SingleRepo {
        async fn find_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError> {
            Ok(self.0.clone().filter(|post| post.id == id))
        }

        async fn list_posts(
            &self,
            _page: PageRequest<PostCursor>,
        ) -> Result<CursorPage<PostRecord>, RepoError> {
            Ok(CursorPage::empty())
        }
    }

    fn origin() -> RequestOrigin {
        RequestOrigin::new("https", "example.com")
    }

    #[tokio::test]
    async fn bare_record_gets_every_fallback() {
        let now = datetime!(2024-02-29 08:00:00 UTC);
        let service = PostPageService::new(Arc::new(SingleRepo(Some(PostRecord::new("a b")))));
        let page = service.load("a b", &origin(), now).await.expect("page");

        assert_eq!(page.title, UNTITLED_POST);
        assert_eq!(page.description, FALLBACK_DESCRIPTION);
        assert_eq!(page.image_url, PLACEHOLDER_IMAGE_URL);
        assert_eq!(page.publish_date, now);
        assert_eq!(page.canonical_url, "https://example.com/posts/a%20b");
        assert_eq!(page.content, "");
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let service = PostPageService::new(Arc::new(SingleRepo(None)));
        let err = service
            .load("missing-123", &origin(), OffsetDateTime::now_utc())
            .await
            .expect_err("missing post");
        assert!(matches!(err, PostPageError::NotFound { id } if id == "missing-123"));
    }
}
