//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod firestore;
pub mod http;
pub mod telemetry;
