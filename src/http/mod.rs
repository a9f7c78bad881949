//! HTTP client module with typed API errors.

mod client;
mod error;

pub use client::HttpClient;
pub use error::{ApiError, is_conflict};
