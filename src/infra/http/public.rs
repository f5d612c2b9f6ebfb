use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_TYPE, HOST},
    },
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use metrics::counter;
use time::OffsetDateTime;
use url::form_urlencoded;

use crate::{
    application::{
        error::HttpError,
        origin::{POSTS_PATH_PREFIX, RequestOrigin, extract_post_id},
        post_page::{METRIC_POST_RENDER_TOTAL, PostPageService},
        sitemap::{METRIC_SITEMAP_RENDER_TOTAL, SitemapService},
    },
    config::HttpSettings,
    presentation::views::render_post_page,
};

use super::middleware::{log_responses, set_request_context};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostPageService>,
    pub sitemap: Arc<SitemapService>,
    pub settings: Arc<HttpSettings>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/posts", get(render_post))
        .route("/posts/{*id}", get(render_post))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/_health", get(health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// First `id` value of the query string; repeats and unrelated pairs are ignored.
fn query_id(uri: &Uri) -> Option<String> {
    form_urlencoded::parse(uri.query()?.as_bytes())
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
}

async fn render_post(State(state): State<HttpState>, uri: Uri, headers: HeaderMap) -> Response {
    let query_id = query_id(&uri);
    match post_page_response(&state, &uri, &headers, query_id.as_deref()).await {
        Ok(response) => {
            counter!(METRIC_POST_RENDER_TOTAL, "outcome" => "ok").increment(1);
            response
        }
        Err(err) => {
            let outcome = match err.status() {
                StatusCode::NOT_FOUND => "not_found",
                StatusCode::BAD_REQUEST => "bad_request",
                _ => "error",
            };
            counter!(METRIC_POST_RENDER_TOTAL, "outcome" => outcome).increment(1);
            err.into_response()
        }
    }
}

async fn post_page_response(
    state: &HttpState,
    uri: &Uri,
    headers: &HeaderMap,
    query_id: Option<&str>,
) -> Result<Response, HttpError> {
    let Some(post_id) = extract_post_id(uri.path(), query_id) else {
        return Err(HttpError::post_not_found(
            "infra::http::public::render_post",
            format!("No post identifier in `{}`", uri.path()),
        ));
    };

    let origin = request_origin(headers, uri, &state.settings.default_scheme)
        .ok_or_else(missing_host)?;

    let page = state
        .posts
        .load(&post_id, &origin, OffsetDateTime::now_utc())
        .await?;
    let html = render_post_page(&page).map_err(HttpError::from)?;

    let mut response = Html(html).into_response();
    set_cache_control(&mut response, &state.settings.post_cache_control());
    Ok(response)
}

async fn sitemap(State(state): State<HttpState>, uri: Uri, headers: HeaderMap) -> Response {
    let Some(origin) = request_origin(&headers, &uri, &state.settings.default_scheme) else {
        return missing_host().into_response();
    };

    match state
        .sitemap
        .sitemap_xml(&origin, OffsetDateTime::now_utc())
        .await
    {
        Ok(body) => {
            counter!(METRIC_SITEMAP_RENDER_TOTAL, "outcome" => "ok").increment(1);
            let mut response = xml_response(body, "application/xml; charset=UTF-8");
            set_cache_control(&mut response, &state.settings.sitemap_cache_control());
            response
        }
        Err(err) => {
            counter!(METRIC_SITEMAP_RENDER_TOTAL, "outcome" => "error").increment(1);
            HttpError::from(err).into_response()
        }
    }
}

async fn robots_txt(State(state): State<HttpState>, uri: Uri, headers: HeaderMap) -> Response {
    let Some(origin) = request_origin(&headers, &uri, &state.settings.default_scheme) else {
        return missing_host().into_response();
    };

    let mut response = plain_response(state.sitemap.robots_txt(&origin));
    set_cache_control(&mut response, &state.settings.sitemap_cache_control());
    response
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `/posts/` with a trailing slash lands here; everything else is unknown.
async fn fallback(state: State<HttpState>, uri: Uri, headers: HeaderMap) -> Response {
    let under_posts = uri
        .path()
        .strip_prefix(POSTS_PATH_PREFIX)
        .is_some_and(|rest| rest.starts_with('/'));
    if under_posts {
        return render_post(state, uri, headers).await;
    }

    HttpError::new(
        "infra::http::public::fallback",
        StatusCode::NOT_FOUND,
        "Not Found",
        format!("No route for `{}`", uri.path()),
    )
    .into_response()
}

/// Scheme and host the client used, honouring the hosting proxy's forwarding headers.
pub fn request_origin(
    headers: &HeaderMap,
    uri: &Uri,
    default_scheme: &str,
) -> Option<RequestOrigin> {
    let host = first_header_value(headers, X_FORWARDED_HOST)
        .or_else(|| first_header_value(headers, HOST.as_str()))
        .or_else(|| uri.authority().map(|authority| authority.as_str().to_string()))?;

    let scheme = first_header_value(headers, X_FORWARDED_PROTO)
        .or_else(|| uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| default_scheme.to_string());

    Some(RequestOrigin::new(scheme, host))
}

fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn missing_host() -> HttpError {
    HttpError::new(
        "infra::http::public::request_origin",
        StatusCode::BAD_REQUEST,
        "Missing host",
        "Request carried neither a forwarded host, a Host header nor an absolute URI",
    )
}

fn set_cache_control(response: &mut Response, policy: &str) {
    if let Ok(value) = HeaderValue::from_str(policy) {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
}

fn xml_response(body: String, content_type: &'static str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn plain_response(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn forwarded_headers_win() {
        let uri: Uri = "/posts/x".parse().expect("uri");
        let origin = request_origin(
            &headers(&[
                ("host", "internal:8080"),
                ("x-forwarded-host", "blog.example.com, cdn.internal"),
                ("x-forwarded-proto", "http, https"),
            ]),
            &uri,
            "https",
        )
        .expect("origin");
        assert_eq!(origin.to_string(), "http://blog.example.com");
    }

    #[test]
    fn host_header_with_default_scheme() {
        let uri: Uri = "/posts/x".parse().expect("uri");
        let origin =
            request_origin(&headers(&[("host", "example.com")]), &uri, "https").expect("origin");
        assert_eq!(origin.post_url("a b"), "https://example.com/posts/a%20b");
    }

    #[test]
    fn absolute_uri_supplies_scheme_and_host() {
        let uri: Uri = "http://localhost:3000/sitemap.xml".parse().expect("uri");
        let origin = request_origin(&HeaderMap::new(), &uri, "https").expect("origin");
        assert_eq!(origin.to_string(), "http://localhost:3000");
    }

    #[test]
    fn query_id_takes_the_first_value() {
        let uri: Uri = "/posts?x=1&id=a%20b&id=c".parse().expect("uri");
        assert_eq!(query_id(&uri).as_deref(), Some("a b"));

        let uri: Uri = "/posts?ids=a".parse().expect("uri");
        assert_eq!(query_id(&uri), None);

        let uri: Uri = "/posts".parse().expect("uri");
        assert_eq!(query_id(&uri), None);
    }

    #[test]
    fn no_host_anywhere_is_none() {
        let uri: Uri = "/sitemap.xml".parse().expect("uri");
        assert!(request_origin(&HeaderMap::new(), &uri, "https").is_none());
    }
}
