//! Domain layer types and invariants.

pub mod fields;
pub mod posts;
pub mod site;
