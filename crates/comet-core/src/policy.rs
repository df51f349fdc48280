//! Literal filtering policy: keyword lists and comet eligibility thresholds.
//!
//! The defaults below are the built-in policy. Each list can be replaced as a
//! whole through configuration (see [`crate::config`]).

use serde::{Deserialize, Serialize};

pub const DEFAULT_PLATFORM_KEYWORDS: &[&str] = &[
    "twitch",
    "youtube",
    "kick",
    "discord",
    "streaming",
    "streamer",
    "ttv",
    "yt",
    "patreon",
    "onlyfans",
    "twitter",
    "instagram",
    "fanpage",
    "fan page",
    "archive",
    "clips",
    "highlights",
    "moments",
    "daily",
    "compilation",
    "best of",
    "edits",
    "updates",
];

pub const DEFAULT_REPOST_PRONOUNS: &[&str] = &["bro", "he", "she", "they"];

pub const DEFAULT_HANDLE_BLACKLIST: &[&str] = &[
    "video", "videos", "clip", "clips", "rate", "rating", "daily", "best", "top",
];

/// Substrings marking trends that are news, launches, or scores rather than
/// something creators take part in. The spaces in `"vs "` and `" vs"` matter.
pub const DEFAULT_TREND_BLACKLIST: &[&str] = &[
    "2024",
    "2025",
    "2026",
    "price",
    "specs",
    "release date",
    "leaked",
    "reveals",
    "highlights",
    "vs ",
    " vs",
    "score",
    "breaking",
    "announces",
    "confirmed",
];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Keyword lists used by the heuristic filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    pub platform_keywords: Vec<String>,
    pub repost_pronouns: Vec<String>,
    pub handle_blacklist: Vec<String>,
    pub trend_blacklist: Vec<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            platform_keywords: owned(DEFAULT_PLATFORM_KEYWORDS),
            repost_pronouns: owned(DEFAULT_REPOST_PRONOUNS),
            handle_blacklist: owned(DEFAULT_HANDLE_BLACKLIST),
            trend_blacklist: owned(DEFAULT_TREND_BLACKLIST),
        }
    }
}

impl FilterPolicy {
    /// Returns the first blacklisted substring found in the lower-cased handle.
    #[must_use]
    pub fn blacklisted_handle_term(&self, handle: &str) -> Option<&str> {
        let handle = handle.to_lowercase();
        self.handle_blacklist
            .iter()
            .find(|term| handle.contains(term.as_str()))
            .map(String::as_str)
    }
}

/// Eligibility thresholds for a Comet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CometCriteria {
    pub min_followers: i64,
    pub max_followers: i64,
    pub min_video_views: i64,
}

impl Default for CometCriteria {
    fn default() -> Self {
        Self {
            min_followers: 10_000,
            max_followers: 100_000,
            min_video_views: 50_000,
        }
    }
}

impl CometCriteria {
    /// Followers must fall strictly inside the open interval and the video's
    /// plays must strictly exceed the floor.
    #[must_use]
    pub fn admits(&self, follower_count: i64, play_count: i64) -> bool {
        self.min_followers < follower_count
            && follower_count < self.max_followers
            && play_count > self.min_video_views
    }
}
