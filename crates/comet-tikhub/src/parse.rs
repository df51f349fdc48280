//! Lenient extraction of domain types from `TikHub` JSON payloads.
//!
//! The API is inconsistent about field names and types (counters arrive as
//! numbers or numeric strings, ids as strings or integers, and several fields
//! have aliases). These helpers never fail: anything unreadable becomes an
//! empty string or zero, and items missing required sub-objects are skipped.

use comet_core::{AccountProfile, CandidateVideo, SearchPage};
use serde_json::Value;

/// Reads a counter that may be an integer, a float, or a numeric string.
/// Anything else is zero.
#[must_use]
pub fn parse_count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| {
                #[allow(clippy::cast_possible_truncation)]
                n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    #[allow(clippy::cast_possible_truncation)]
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// First non-zero counter among `keys`, in order.
fn first_count(obj: &Value, keys: &[&str]) -> i64 {
    keys.iter()
        .map(|k| parse_count(obj.get(*k)))
        .find(|n| *n != 0)
        .unwrap_or(0)
}

/// A string or integer field rendered as a string; empty when absent.
fn text(obj: &Value, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// First non-empty text field among `keys`.
fn first_text(obj: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| text(obj, k))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Builds an [`AccountProfile`] from an author or user object.
#[must_use]
pub fn parse_author(author: &Value) -> AccountProfile {
    let avatar_url = author
        .get("avatar_thumb")
        .and_then(|a| a.get("url_list"))
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    AccountProfile {
        user_id: first_text(author, &["sec_uid", "uid"]),
        handle: text(author, "unique_id"),
        nickname: text(author, "nickname"),
        avatar_url,
        signature: text(author, "signature"),
        follower_count: first_count(author, &["follower_count", "mplatform_followers_count"]),
        heart_count: first_count(author, &["total_favorited", "heart_count", "digg_count"]),
        video_count: first_count(author, &["aweme_count", "video_count"]),
    }
}

/// One search item, or `None` when `aweme_info`, its author, or its
/// statistics are missing or empty.
#[must_use]
pub fn parse_search_item(item: &Value) -> Option<CandidateVideo> {
    let info = non_empty_object(item.get("aweme_info"))?;
    let author = non_empty_object(info.get("author"))?;
    let statistics = non_empty_object(info.get("statistics"))?;

    let video_id = {
        let id = text(info, "aweme_id");
        if id.is_empty() {
            text(item, "aweme_id")
        } else {
            id
        }
    };

    Some(CandidateVideo {
        video_id,
        caption: text(info, "desc"),
        play_count: parse_count(statistics.get("play_count")),
        author: parse_author(author),
    })
}

fn non_empty_object(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
}

/// Parses a search response envelope into a [`SearchPage`].
#[must_use]
pub fn parse_search_page(body: &Value) -> SearchPage {
    let data = body.get("data").unwrap_or(&Value::Null);
    let items = data
        .get("search_item_list")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(parse_search_item).collect())
        .unwrap_or_default();

    let has_more = match data.get("has_more") {
        Some(Value::Bool(b)) => *b,
        other => parse_count(other) != 0,
    };

    SearchPage {
        items,
        has_more,
        next_cursor: parse_count(data.get("cursor")),
    }
}

/// Extracts the profile from a `handler_user_profile` envelope.
///
/// Returns `None` when `code` is present and not 200, or when `data.user` is
/// missing or empty.
#[must_use]
pub fn parse_profile(body: &Value) -> Option<AccountProfile> {
    if !envelope_ok(body) {
        return None;
    }
    let user = non_empty_object(body.get("data").and_then(|d| d.get("user")))?;
    Some(parse_author(user))
}

/// `true` unless the envelope carries a `code` other than 200.
#[must_use]
pub fn envelope_ok(body: &Value) -> bool {
    match body.get("code") {
        None | Some(Value::Null) => true,
        code => parse_count(code) == 200,
    }
}

const TRENDING_LIST_FIELDS: &[&str] = &["trending_search_words", "word_list", "trending_list"];
const TRENDING_WORD_FIELDS: &[&str] = &["trendingSearchWord", "word", "keyword", "title"];

/// Extracts up to `limit` trending keywords.
///
/// The word list lives under one of several keys of `data`, or `data` is the
/// list itself. Each entry is a bare string or an object carrying the word
/// under one of several keys. Words are trimmed; empty ones are dropped.
#[must_use]
pub fn parse_trending_words(body: &Value, limit: usize) -> Vec<String> {
    let list = match body.get("data") {
        Some(Value::Array(list)) => Some(list),
        Some(data) if data.is_object() => TRENDING_LIST_FIELDS
            .iter()
            .find_map(|f| data.get(*f))
            .and_then(Value::as_array),
        _ => None,
    };

    let Some(list) = list else {
        return Vec::new();
    };

    list.iter()
        .take(limit)
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(_) => TRENDING_WORD_FIELDS
                .iter()
                .find_map(|f| entry.get(*f))
                .and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
