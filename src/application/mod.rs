//! Application services layer.

pub mod error;
pub mod origin;
pub mod pagination;
pub mod post_page;
pub mod repos;
pub mod sitemap;
