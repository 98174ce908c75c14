//! Paged access to the e-procurement open-data listings.
//!
//! [`Fetcher`] drives one page through the shared retry policy; the
//! [`Transport`] underneath is libcurl in production and scripted in tests.

mod fetcher;
mod live;
mod parse;
mod request;

pub use fetcher::{Fetcher, PageBatch, PageFetch};
pub use live::CurlTransport;
pub use parse::{parse_page, ParsedPage};
pub use request::{inquiry_window, redact_service_key, Endpoint, PageRequest};

use async_trait::async_trait;

use crate::retry::Outcome;

/// Performs one GET. Never fails: transport problems come back as
/// [`Outcome::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Outcome;
}
