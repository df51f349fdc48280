use crate::app_config::{AppConfig, StorageConfig};
use crate::policy::{CometCriteria, FilterPolicy};
use crate::ConfigError;

const DEFAULT_TIKHUB_BASE_URL: &str = "https://api.tikhub.io";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                invalid(var, format!("expected true/false, got '{raw}'"))
            }),
        }
    };

    // A set but empty list would silently switch a filter off.
    let parse_list = |var: &str, default: Vec<String>| -> Result<Vec<String>, ConfigError> {
        let Ok(raw) = lookup(var) else {
            return Ok(default);
        };
        let items = split_list(&raw);
        if items.is_empty() {
            return Err(invalid(
                var,
                "must list at least one comma-separated entry".to_string(),
            ));
        }
        Ok(items)
    };

    // The hosting platform exposes its direct (non-pooled) URL under a
    // different name; accept either.
    let database_url = require("DATABASE_URL")
        .or_else(|_| require("POSTGRES_URL_NON_POOLING"))
        .or_else(|_| require("POSTGRES_URL"))
        .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
    let tikhub_api_key = require("TIKHUB_API_KEY")?;
    let tikhub_base_url = or_default("TIKHUB_BASE_URL", DEFAULT_TIKHUB_BASE_URL);

    let log_level = or_default("COMET_LOG_LEVEL", "info");

    let anthropic_api_key = optional("ANTHROPIC_API_KEY");
    let anthropic_model = or_default("COMET_ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL);
    let openai_api_key = optional("OPENAI_API_KEY");
    let openai_model = or_default("COMET_OPENAI_MODEL", DEFAULT_OPENAI_MODEL);

    let storage_url = optional("SUPABASE_URL").or_else(|| optional("NEXT_PUBLIC_SUPABASE_URL"));
    let storage = match (storage_url, optional("SUPABASE_SERVICE_ROLE_KEY")) {
        (Some(base_url), Some(service_key)) => Some(StorageConfig {
            base_url,
            service_key,
            bucket: or_default("COMET_AVATAR_BUCKET", "avatars"),
        }),
        _ => None,
    };

    let db_max_connections = parse_u32("COMET_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("COMET_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("COMET_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let criteria = CometCriteria {
        min_followers: parse_i64("COMET_MIN_FOLLOWERS", "10000")?,
        max_followers: parse_i64("COMET_MAX_FOLLOWERS", "100000")?,
        min_video_views: parse_i64("COMET_MIN_VIDEO_VIEWS", "50000")?,
    };
    if criteria.min_followers >= criteria.max_followers {
        return Err(invalid(
            "COMET_MAX_FOLLOWERS",
            format!(
                "must be greater than COMET_MIN_FOLLOWERS ({})",
                criteria.min_followers
            ),
        ));
    }

    let defaults = FilterPolicy::default();
    let policy = FilterPolicy {
        platform_keywords: parse_list("COMET_PLATFORM_KEYWORDS", defaults.platform_keywords)?,
        repost_pronouns: parse_list("COMET_REPOST_PRONOUNS", defaults.repost_pronouns)?,
        handle_blacklist: parse_list("COMET_HANDLE_BLACKLIST", defaults.handle_blacklist)?,
        trend_blacklist: parse_list("COMET_TREND_BLACKLIST", defaults.trend_blacklist)?,
    };

    let trend_fetch_limit = parse_usize("COMET_TREND_FETCH_LIMIT", "100")?;
    let trend_region = or_default("COMET_TREND_REGION", "US");
    let top_trends = parse_usize("COMET_TOP_TRENDS", "10")?;
    let max_search_pages = parse_u32("COMET_MAX_SEARCH_PAGES", "10")?;
    let search_page_size = parse_u32("COMET_SEARCH_PAGE_SIZE", "20")?;
    let publish_time_days = parse_u32("COMET_PUBLISH_TIME_DAYS", "7")?;
    let fetch_profile_in_discovery = parse_bool("COMET_FETCH_PROFILE_IN_DISCOVERY", true)?;
    let personality_filter_enabled = parse_bool("COMET_PERSONALITY_FILTER", true)?;
    let stale_creator_days = parse_u32("COMET_STALE_CREATOR_DAYS", "14")?;

    let parallel_workers = parse_usize("COMET_PARALLEL_WORKERS", "1")?;
    if parallel_workers == 0 {
        return Err(invalid(
            "COMET_PARALLEL_WORKERS",
            "must be at least 1".to_string(),
        ));
    }

    let request_timeout_secs = parse_u64("COMET_REQUEST_TIMEOUT_SECS", "30")?;
    let ai_timeout_secs = parse_u64("COMET_AI_TIMEOUT_SECS", "30")?;
    let inter_request_delay_ms = parse_u64("COMET_INTER_REQUEST_DELAY_MS", "500")?;
    let max_retries = parse_u32("COMET_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("COMET_RETRY_BACKOFF_BASE_MS", "1000")?;
    let download_concurrency = parse_usize("COMET_DOWNLOAD_CONCURRENCY", "2")?.max(1);

    Ok(AppConfig {
        database_url,
        log_level,
        tikhub_api_key,
        tikhub_base_url,
        anthropic_api_key,
        anthropic_model,
        openai_api_key,
        openai_model,
        storage,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        criteria,
        policy,
        trend_fetch_limit,
        trend_region,
        top_trends,
        max_search_pages,
        search_page_size,
        publish_time_days,
        fetch_profile_in_discovery,
        personality_filter_enabled,
        stale_creator_days,
        parallel_workers,
        request_timeout_secs,
        ai_timeout_secs,
        inter_request_delay_ms,
        max_retries,
        retry_backoff_base_ms,
        download_concurrency,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Comma-separated list; entries are trimmed and empty entries dropped.
/// Spaces inside an entry are kept, so `"fan page"` stays one term.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
