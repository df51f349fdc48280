//! Collaborator traits for the external APIs the engine reads from, and
//! their `TikHub` implementations.

use async_trait::async_trait;
use comet_core::{AccountProfile, SearchPage};
use comet_tikhub::TikHubClient;

use crate::error::SourceError;

#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Ordered trending keywords, best first.
    async fn fetch_trending(&self, limit: usize, region: &str) -> Result<Vec<String>, SourceError>;
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// One page of candidate videos. `cursor` is 0 for the first page.
    async fn search(&self, keyword: &str, cursor: i64) -> Result<SearchPage, SourceError>;
}

#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Current profile, or `None` when the account is unavailable.
    async fn fetch_profile(&self, handle: &str) -> Result<Option<AccountProfile>, SourceError>;
}

#[async_trait]
impl TrendSource for TikHubClient {
    async fn fetch_trending(&self, limit: usize, region: &str) -> Result<Vec<String>, SourceError> {
        Ok(self.fetch_trending_keywords(limit, region).await?)
    }
}

#[async_trait]
impl VideoSearch for TikHubClient {
    async fn search(&self, keyword: &str, cursor: i64) -> Result<SearchPage, SourceError> {
        Ok(self.search_videos(keyword, cursor).await?)
    }
}

#[async_trait]
impl ProfileFetcher for TikHubClient {
    async fn fetch_profile(&self, handle: &str) -> Result<Option<AccountProfile>, SourceError> {
        Ok(self.fetch_user_profile(handle).await?)
    }
}
