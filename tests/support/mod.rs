#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use prerender::application::pagination::{CursorPage, PageRequest, PostCursor};
use prerender::application::post_page::PostPageService;
use prerender::application::repos::{PostsRepo, RepoError};
use prerender::application::sitemap::SitemapService;
use prerender::config::HttpSettings;
use prerender::domain::posts::PostRecord;
use prerender::infra::http::{HttpState, build_router};

/// In-memory post collection paging by offset tokens.
#[derive(Default)]
pub struct MemoryRepo {
    posts: Vec<PostRecord>,
    failure: Option<String>,
    list_calls: Mutex<Vec<Option<String>>>,
}

impl MemoryRepo {
    pub fn with_posts(posts: Vec<PostRecord>) -> Self {
        Self {
            posts,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().expect("list calls lock").clone()
    }

    fn check_available(&self) -> Result<(), RepoError> {
        match &self.failure {
            Some(message) => Err(RepoError::from_persistence(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryRepo {
    async fn find_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError> {
        self.check_available()?;
        Ok(self.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn list_posts(
        &self,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        self.check_available()?;
        let token = page.cursor.as_ref().map(PostCursor::encode);
        self.list_calls
            .lock()
            .expect("list calls lock")
            .push(token.clone());

        let offset = match token {
            Some(token) => token
                .strip_prefix("offset-")
                .and_then(|value| value.parse::<usize>().ok())
                .ok_or_else(|| RepoError::from_persistence(format!("bad token {token}")))?,
            None => 0,
        };
        let end = (offset + page.limit as usize).min(self.posts.len());
        let items = self.posts.get(offset..end).unwrap_or_default().to_vec();
        let next_cursor = (end < self.posts.len()).then(|| format!("offset-{end}"));
        Ok(CursorPage::new(items, next_cursor))
    }
}

pub fn router(repo: Arc<MemoryRepo>, page_size: u32) -> Router {
    let posts: Arc<dyn PostsRepo> = repo;
    build_router(HttpState {
        posts: Arc::new(PostPageService::new(posts.clone())),
        sitemap: Arc::new(SitemapService::new(posts, page_size)),
        settings: Arc::new(HttpSettings::default()),
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).expect("utf8 body"),
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("host", "example.com")
        .body(Body::empty())
        .expect("request should build");
    send(router, request).await
}

pub fn titled(id: &str, title: &str) -> PostRecord {
    PostRecord {
        title: Some(title.to_string()),
        ..PostRecord::new(id)
    }
}
