use crate::policy::{CometCriteria, FilterPolicy};

/// Credentials for the avatar storage bucket. Present only when both the
/// project URL and the service key are configured.
#[derive(Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"[redacted]")
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub tikhub_api_key: String,
    pub tikhub_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub storage: Option<StorageConfig>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub criteria: CometCriteria,
    pub policy: FilterPolicy,
    pub trend_fetch_limit: usize,
    pub trend_region: String,
    pub top_trends: usize,
    pub max_search_pages: u32,
    pub search_page_size: u32,
    pub publish_time_days: u32,
    pub fetch_profile_in_discovery: bool,
    pub personality_filter_enabled: bool,
    pub stale_creator_days: u32,
    pub parallel_workers: usize,
    pub request_timeout_secs: u64,
    pub ai_timeout_secs: u64,
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub download_concurrency: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("tikhub_api_key", &"[redacted]")
            .field("tikhub_base_url", &self.tikhub_base_url)
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("anthropic_model", &self.anthropic_model)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_model", &self.openai_model)
            .field("storage", &self.storage)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("criteria", &self.criteria)
            .field("policy", &self.policy)
            .field("trend_fetch_limit", &self.trend_fetch_limit)
            .field("trend_region", &self.trend_region)
            .field("top_trends", &self.top_trends)
            .field("max_search_pages", &self.max_search_pages)
            .field("search_page_size", &self.search_page_size)
            .field("publish_time_days", &self.publish_time_days)
            .field(
                "fetch_profile_in_discovery",
                &self.fetch_profile_in_discovery,
            )
            .field(
                "personality_filter_enabled",
                &self.personality_filter_enabled,
            )
            .field("stale_creator_days", &self.stale_creator_days)
            .field("parallel_workers", &self.parallel_workers)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("download_concurrency", &self.download_concurrency)
            .finish()
    }
}
