//! HTTP client for the `TikHub` REST API.
//!
//! Wraps `reqwest` with bearer authentication, retry on transient failures,
//! and lenient response parsing (see [`crate::parse`]).

use std::time::Duration;

use comet_core::{AccountProfile, SearchPage};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::TikHubError;
use crate::parse::{envelope_ok, parse_profile, parse_search_page, parse_trending_words};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.tikhub.io/";
const SEARCH_PATH: &str = "api/v1/tiktok/app/v3/fetch_video_search_result";
const PROFILE_PATH: &str = "api/v1/tiktok/app/v3/handler_user_profile";
const TRENDING_PATH: &str = "api/v1/tiktok/web/fetch_trending_searchwords";

/// Query parameters sent with every video search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Only videos published within this many days.
    pub publish_time_days: u32,
    /// 0 = relevance.
    pub sort_type: u32,
    pub page_size: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            publish_time_days: 7,
            sort_type: 0,
            page_size: 20,
        }
    }
}

/// Client for the `TikHub` API.
///
/// Use [`TikHubClient::new`] for production or [`TikHubClient::with_base_url`]
/// to point at a mock server in tests.
pub struct TikHubClient {
    client: Client,
    base_url: Url,
    search: SearchOptions,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl TikHubClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`TikHubError::InvalidConfig`] if the API key cannot be sent as
    /// a header, or [`TikHubError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, TikHubError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`TikHubError::InvalidConfig`] if `base_url` is not a valid URL
    /// or the API key cannot be sent as a header, or [`TikHubError::Http`] if
    /// the `reqwest::Client` cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, TikHubError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| TikHubError::InvalidConfig(format!("API key is not a valid header: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("comet/0.1 (creator-discovery)")
            .default_headers(headers)
            .build()?;

        // Exactly one trailing slash so relative joins append to the path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            TikHubError::InvalidConfig(format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            base_url,
            search: SearchOptions::default(),
            max_retries: 2,
            backoff_base_ms: 1_000,
        })
    }

    #[must_use]
    pub fn with_search_options(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetches one page of videos matching `keyword`.
    ///
    /// A leading `#` is stripped from the keyword. `cursor` is 0 for the first
    /// page, then the `next_cursor` of the previous page.
    ///
    /// # Errors
    ///
    /// - [`TikHubError::Http`] on network failure or non-2xx status, after retries.
    /// - [`TikHubError::Api`] if the envelope reports a non-200 code.
    /// - [`TikHubError::Deserialize`] if the body is not JSON.
    pub async fn search_videos(
        &self,
        keyword: &str,
        cursor: i64,
    ) -> Result<SearchPage, TikHubError> {
        let keyword = keyword.trim_start_matches('#');
        let url = self.build_url(
            SEARCH_PATH,
            &[
                ("keyword", keyword),
                ("publish_time", &self.search.publish_time_days.to_string()),
                ("sort_type", &self.search.sort_type.to_string()),
                ("cursor", &cursor.to_string()),
                ("count", &self.search.page_size.to_string()),
            ],
        )?;
        let body = self.get_json(&url).await?;
        Self::check_envelope(&body)?;
        Ok(parse_search_page(&body))
    }

    /// Fetches the full profile for `handle`.
    ///
    /// Returns `Ok(None)` when the API reports the account as unavailable
    /// (non-200 `code`) or the payload has no user object.
    ///
    /// # Errors
    ///
    /// - [`TikHubError::Http`] on network failure or non-2xx status, after retries.
    /// - [`TikHubError::Deserialize`] if the body is not JSON.
    pub async fn fetch_user_profile(
        &self,
        handle: &str,
    ) -> Result<Option<AccountProfile>, TikHubError> {
        let url = self.build_url(PROFILE_PATH, &[("unique_id", handle)])?;
        let body = self.get_json(&url).await?;
        Ok(parse_profile(&body))
    }

    /// Fetches up to `limit` trending search keywords for `region`.
    ///
    /// # Errors
    ///
    /// - [`TikHubError::Http`] on network failure or non-2xx status, after retries.
    /// - [`TikHubError::Api`] if the envelope reports a non-200 code.
    /// - [`TikHubError::Deserialize`] if the body is not JSON.
    pub async fn fetch_trending_keywords(
        &self,
        limit: usize,
        region: &str,
    ) -> Result<Vec<String>, TikHubError> {
        let url = self.build_url(
            TRENDING_PATH,
            &[("region", region), ("count", &limit.to_string())],
        )?;
        let body = self.get_json(&url).await?;
        Self::check_envelope(&body)?;
        let words = parse_trending_words(&body, limit);
        tracing::info!(count = words.len(), region, "fetched trending keywords");
        Ok(words)
    }

    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, TikHubError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TikHubError::InvalidConfig(format!("invalid path '{path}': {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json(&self, url: &Url) -> Result<Value, TikHubError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_json(url)
        })
        .await
    }

    async fn request_json(&self, url: &Url) -> Result<Value, TikHubError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TikHubError::Deserialize {
            context: url.path().to_string(),
            source: e,
        })
    }

    fn check_envelope(body: &Value) -> Result<(), TikHubError> {
        if envelope_ok(body) {
            return Ok(());
        }
        let code = body.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = ["message", "msg", "detail"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .unwrap_or("unknown error")
            .to_string();
        Err(TikHubError::Api { code, message })
    }
}
