//! Fixed identity of the published blog.

pub const SITE_NAME: &str = "Chenglin Pua's Blog";
pub const AUTHOR_NAME: &str = "Chenglin Pua";

pub const UNTITLED_POST: &str = "Untitled post";
pub const FALLBACK_DESCRIPTION: &str = "Read this article on Chenglin Pua's blog.";
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://via.placeholder.com/1200x630.png?text=Chenglin+Pua+Blog";

/// Robots directive advertised on every post page.
pub const ROBOTS_DIRECTIVE: &str =
    "index, follow, max-image-preview:large, max-snippet:-1, max-video-preview:-1";

/// Storage URL schemes that browsers and crawlers cannot resolve.
pub const NON_PUBLIC_IMAGE_SCHEMES: &[&str] = &["gs://"];
