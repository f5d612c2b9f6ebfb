//! Presentation layer: HTML escaping and the post page template.

pub mod escape;
pub mod views;
