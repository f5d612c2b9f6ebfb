use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{post_page::PostPageError, sitemap::SitemapError},
    config::LoadError,
    infra::error::InfraError,
};

pub const POST_NOT_FOUND_MESSAGE: &str = "Sorry, we couldn't find that post.";
pub const POST_FAILURE_MESSAGE: &str = "An unexpected error occurred while loading the post.";
pub const SITEMAP_FAILURE_MESSAGE: &str = "Failed to generate sitemap";

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// An error answered with a fixed public body; the diagnostic chain travels
/// in the response extensions for the logging middleware.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn public_message(&self) -> &'static str {
        self.public_message
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub fn post_not_found(source: &'static str, detail: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, POST_NOT_FOUND_MESSAGE, detail)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<PostPageError> for HttpError {
    fn from(error: PostPageError) -> Self {
        match error {
            PostPageError::NotFound { id } => HttpError::post_not_found(
                "application::error::post_page_error_to_http_error",
                format!("No post stored under `{id}`"),
            ),
            PostPageError::Repo(err) => HttpError::from_error(
                "application::error::post_page_error_to_http_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                POST_FAILURE_MESSAGE,
                &err,
            ),
        }
    }
}

impl From<SitemapError> for HttpError {
    fn from(error: SitemapError) -> Self {
        HttpError::from_error(
            "application::error::sitemap_error_to_http_error",
            StatusCode::INTERNAL_SERVER_ERROR,
            SITEMAP_FAILURE_MESSAGE,
            &error,
        )
    }
}

/// Top-level failure of a binary command.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<PostPageError> for AppError {
    fn from(error: PostPageError) -> Self {
        match error {
            PostPageError::NotFound { id } => AppError::NotFound(format!("post `{id}`")),
            PostPageError::Repo(err) => AppError::Infra(InfraError::store(err.to_string())),
        }
    }
}

impl From<SitemapError> for AppError {
    fn from(error: SitemapError) -> Self {
        AppError::Infra(InfraError::store(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::application::repos::RepoError;

    #[derive(Debug, Error)]
    #[error("outer failure")]
    struct Outer(#[source] io::Error);

    #[test]
    fn report_collects_the_source_chain() {
        let error = Outer(io::Error::other("socket closed"));
        let report = ErrorReport::from_error("test", StatusCode::BAD_GATEWAY, &error);
        assert_eq!(report.messages, vec!["outer failure", "socket closed"]);
    }

    #[test]
    fn store_failures_hide_details_behind_generic_message() {
        let error: HttpError =
            PostPageError::Repo(RepoError::from_persistence("connection refused")).into();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), POST_FAILURE_MESSAGE);
        assert!(error.report().messages[0].contains("connection refused"));
    }

    #[test]
    fn missing_posts_map_to_not_found() {
        let error: HttpError = PostPageError::NotFound {
            id: "missing-123".to_string(),
        }
        .into();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.public_message(), POST_NOT_FOUND_MESSAGE);
    }
}
