//! Request origin and canonical URL construction.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const POSTS_PATH_PREFIX: &str = "/posts";

/// Scheme and host the client used to reach this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    scheme: String,
    host: String,
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().trim().to_ascii_lowercase(),
            host: host.into().trim().trim_end_matches('/').to_string(),
        }
    }

    /// Parse an origin such as `https://example.com` (a trailing slash is tolerated).
    pub fn parse(origin: &str) -> Option<Self> {
        let (scheme, rest) = origin.trim().split_once("://")?;
        let host = rest.trim_end_matches('/');
        if scheme.is_empty() || host.is_empty() || host.contains('/') {
            return None;
        }
        Some(Self::new(scheme, host))
    }

    /// `{scheme}://{host}/`
    pub fn root_url(&self) -> String {
        format!("{self}/")
    }

    /// `{scheme}://{host}/posts/{urlEncodedId}`
    pub fn post_url(&self, post_id: &str) -> String {
        format!(
            "{self}{POSTS_PATH_PREFIX}/{}",
            utf8_percent_encode(post_id, URI_COMPONENT)
        )
    }

    pub fn sitemap_url(&self) -> String {
        format!("{self}/sitemap.xml")
    }
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}

/// Resolve the post identifier of a render request.
///
/// The identifier is the final non-empty segment of `path` below the posts
/// prefix, percent-decoded. When the path names no post, the `id` query
/// value is used instead. Blank identifiers and encodings that do not decode
/// to UTF-8 resolve to `None`.
pub fn extract_post_id(path: &str, query_id: Option<&str>) -> Option<String> {
    let below_prefix = path
        .strip_prefix(POSTS_PATH_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(path);

    let segment = below_prefix.split('/').rev().find(|segment| !segment.is_empty());

    match segment {
        Some(segment) => decode_component(segment),
        None => query_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
    }
}

fn decode_component(segment: &str) -> Option<String> {
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn https(host: &str) -> RequestOrigin {
        RequestOrigin::new("https", host)
    }

    #[test]
    fn canonical_url_percent_encodes_the_identifier() {
        assert_eq!(
            https("example.com").post_url("a b"),
            "https://example.com/posts/a%20b"
        );
        assert_eq!(
            https("example.com").post_url("ünï/cöde?x=1&y"),
            "https://example.com/posts/%C3%BCn%C3%AF%2Fc%C3%B6de%3Fx%3D1%26y"
        );
    }

    #[test]
    fn canonical_url_keeps_uri_component_marks() {
        assert_eq!(
            https("example.com").post_url("it's-(ok)_v1.0~!*"),
            "https://example.com/posts/it's-(ok)_v1.0~!*"
        );
    }

    #[test]
    fn root_and_sitemap_urls() {
        let origin = RequestOrigin::new("HTTP", "localhost:3000/");
        assert_eq!(origin.root_url(), "http://localhost:3000/");
        assert_eq!(origin.sitemap_url(), "http://localhost:3000/sitemap.xml");
    }

    #[test]
    fn parses_command_line_origins() {
        assert_eq!(
            RequestOrigin::parse("https://blog.example.com/"),
            Some(https("blog.example.com"))
        );
        assert_eq!(RequestOrigin::parse("blog.example.com"), None);
        assert_eq!(RequestOrigin::parse("https://"), None);
        assert_eq!(RequestOrigin::parse("https://example.com/posts"), None);
    }

    #[test]
    fn extracts_identifier_from_final_segment() {
        assert_eq!(
            extract_post_id("/posts/hello-world", None).as_deref(),
            Some("hello-world")
        );
        assert_eq!(
            extract_post_id("/posts/hello-world/", None).as_deref(),
            Some("hello-world")
        );
        assert_eq!(
            extract_post_id("/posts/a%20b", Some("ignored")).as_deref(),
            Some("a b")
        );
        assert_eq!(
            extract_post_id("/posts/2024/archive-item", None).as_deref(),
            Some("archive-item")
        );
    }

    #[test]
    fn falls_back_to_query_identifier() {
        assert_eq!(extract_post_id("/posts", Some("abc")).as_deref(), Some("abc"));
        assert_eq!(extract_post_id("/posts/", Some("abc")).as_deref(), Some("abc"));
        assert_eq!(extract_post_id("/posts", Some("  ")), None);
        assert_eq!(extract_post_id("/posts", None), None);
    }

    #[test]
    fn rejects_undecodable_identifiers() {
        assert_eq!(extract_post_id("/posts/%FF%FE", None), None);
        assert_eq!(extract_post_id("/posts/%20", None), None);
    }

    #[test]
    fn post_named_posts_is_reachable() {
        assert_eq!(
            extract_post_id("/posts/posts", None).as_deref(),
            Some("posts")
        );
    }
}
