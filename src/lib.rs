//! Server-side rendered post pages and sitemap for a Firestore-backed blog.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
