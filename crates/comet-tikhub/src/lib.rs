//! HTTP client for the `TikHub` video-search, profile, and trending APIs.

pub mod client;
pub mod error;
pub mod parse;
pub(crate) mod retry;

pub use client::{SearchOptions, TikHubClient};
pub use error::TikHubError;
