//! HTTP surface for device ingestion, queries and live streams

pub mod http;

pub use http::{create_router, AppState};
