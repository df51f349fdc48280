use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An account as reported by the video-search or profile API, already
/// normalized: counters that were missing or non-numeric are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub user_id: String,
    pub handle: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub signature: String,
    pub follower_count: i64,
    pub heart_count: i64,
    pub video_count: i64,
}

/// One item from a keyword search: the video plus its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVideo {
    pub video_id: String,
    pub caption: String,
    pub play_count: i64,
    pub author: AccountProfile,
}

/// A page of search results and the cursor for the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<CandidateVideo>,
    pub has_more: bool,
    pub next_cursor: i64,
}

/// Mutable identity fields of a roster creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorIdentity {
    pub user_id: String,
    pub handle: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub signature: String,
    pub last_updated_at: DateTime<Utc>,
}

impl CreatorIdentity {
    #[must_use]
    pub fn from_profile(profile: &AccountProfile, now: DateTime<Utc>) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            handle: profile.handle.clone(),
            nickname: profile.nickname.clone(),
            avatar_url: profile.avatar_url.clone(),
            signature: profile.signature.clone(),
            last_updated_at: now,
        }
    }
}

/// How a creator entered the roster. Written on first insert only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub discovered_via_trend: Option<String>,
    pub breakout_video_id: Option<String>,
}

/// The most recent stored snapshot before some date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorSnapshot {
    pub follower_count: i64,
    pub heart_count: i64,
    pub video_count: i64,
    pub recorded_date: NaiveDate,
}

/// One `creator_stats` row ready to be written.
///
/// `source_trend = None` means "no attribution this update"; the store
/// resolves it to the creator's discovery trend on insert and keeps any
/// stored value on conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub user_id: String,
    pub recorded_date: NaiveDate,
    pub follower_count: i64,
    pub heart_count: i64,
    pub video_count: i64,
    pub daily_growth_followers: i64,
    pub daily_growth_percent: Decimal,
    pub source_trend: Option<String>,
}
