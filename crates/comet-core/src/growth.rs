//! Follower growth against the most recent prior snapshot.
//!
//! The pipeline does not run every day, so the gap between two snapshots can
//! span several days. Growth is averaged over the gap: a three-day jump of
//! 300 followers is reported as 100 per day, never as a single-day spike.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::types::{AccountProfile, PriorSnapshot, StatSnapshot};

/// Daily growth figures stored alongside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Growth {
    /// Average followers gained per day, truncated toward zero.
    pub daily_followers: i64,
    /// Average daily growth as a percentage of the prior follower count,
    /// rounded half-to-even to two places.
    pub daily_percent: Decimal,
}

impl Growth {
    #[must_use]
    pub fn zero() -> Self {
        Self {
            daily_followers: 0,
            daily_percent: Decimal::new(0, 2),
        }
    }
}

/// Computes growth for `current_followers` observed on `today`.
///
/// With no prior snapshot the growth is zero. The elapsed gap is clamped to at
/// least one day so same-day re-runs and clock skew never divide by zero.
#[must_use]
pub fn compute_growth(
    current_followers: i64,
    previous: Option<&PriorSnapshot>,
    today: NaiveDate,
) -> Growth {
    let Some(prev) = previous else {
        return Growth::zero();
    };

    let days = (today - prev.recorded_date).num_days().max(1);
    let raw_delta = current_followers.saturating_sub(prev.follower_count);

    // Integer division truncates toward zero, matching the stored column.
    let daily_followers = raw_delta / days;

    let daily_percent = if prev.follower_count == 0 {
        Decimal::new(0, 2)
    } else {
        let numerator = Decimal::from(raw_delta) * Decimal::ONE_HUNDRED;
        let denominator = Decimal::from(days) * Decimal::from(prev.follower_count);
        let mut pct = numerator
            .checked_div(denominator)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2);
        pct.rescale(2);
        pct
    };

    Growth {
        daily_followers,
        daily_percent,
    }
}

/// Builds the snapshot row for `profile` on `today`.
#[must_use]
pub fn build_snapshot(
    profile: &AccountProfile,
    previous: Option<&PriorSnapshot>,
    today: NaiveDate,
    source_trend: Option<&str>,
) -> StatSnapshot {
    let growth = compute_growth(profile.follower_count, previous, today);
    StatSnapshot {
        user_id: profile.user_id.clone(),
        recorded_date: today,
        follower_count: profile.follower_count,
        heart_count: profile.heart_count,
        video_count: profile.video_count,
        daily_growth_followers: growth.daily_followers,
        daily_growth_percent: growth.daily_percent,
        source_trend: source_trend.map(str::to_owned),
    }
}
