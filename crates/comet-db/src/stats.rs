//! Database operations for the `creator_stats` table.

use chrono::{DateTime, NaiveDate, Utc};
use comet_core::{PriorSnapshot, StatSnapshot};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::DbError;

/// A row from the `creator_stats` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CreatorStatsRow {
    pub id: i64,
    pub user_id: String,
    pub recorded_date: NaiveDate,
    pub follower_count: i64,
    pub heart_count: i64,
    pub video_count: i64,
    pub daily_growth_followers: i64,
    pub daily_growth_percent: Decimal,
    pub source_trend: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PriorSnapshotRow {
    follower_count: i64,
    heart_count: i64,
    video_count: i64,
    recorded_date: NaiveDate,
}

/// Returns the most recent snapshot strictly before `before`.
///
/// This is not necessarily yesterday's: runs can skip days.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_prior_snapshot(
    conn: &mut PgConnection,
    user_id: &str,
    before: NaiveDate,
) -> Result<Option<PriorSnapshot>, DbError> {
    let row = sqlx::query_as::<_, PriorSnapshotRow>(
        "SELECT follower_count, heart_count, video_count, recorded_date \
         FROM creator_stats \
         WHERE user_id = $1 AND recorded_date < $2 \
         ORDER BY recorded_date DESC \
         LIMIT 1",
    )
    .bind(user_id)
    .bind(before)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| PriorSnapshot {
        follower_count: r.follower_count,
        heart_count: r.heart_count,
        video_count: r.video_count,
        recorded_date: r.recorded_date,
    }))
}

/// Inserts or updates the snapshot for `(user_id, recorded_date)`.
///
/// A `None` source trend is resolved to the creator's discovery trend on
/// insert. On conflict the counts and growth are overwritten, but a stored
/// source trend is never replaced by `NULL`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails (including a foreign-key
/// violation when the creator does not exist).
pub async fn upsert_snapshot(
    conn: &mut PgConnection,
    snapshot: &StatSnapshot,
) -> Result<CreatorStatsRow, DbError> {
    let row = sqlx::query_as::<_, CreatorStatsRow>(
        "INSERT INTO creator_stats \
             (user_id, recorded_date, follower_count, heart_count, video_count, \
              daily_growth_followers, daily_growth_percent, source_trend) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, \
                 COALESCE($8, (SELECT discovered_via_trend FROM creators WHERE user_id = $1))) \
         ON CONFLICT (user_id, recorded_date) DO UPDATE SET \
             follower_count = EXCLUDED.follower_count, \
             heart_count = EXCLUDED.heart_count, \
             video_count = EXCLUDED.video_count, \
             daily_growth_followers = EXCLUDED.daily_growth_followers, \
             daily_growth_percent = EXCLUDED.daily_growth_percent, \
             source_trend = COALESCE(EXCLUDED.source_trend, creator_stats.source_trend) \
         RETURNING id, user_id, recorded_date, follower_count, heart_count, video_count, \
                   daily_growth_followers, daily_growth_percent, source_trend, created_at",
    )
    .bind(&snapshot.user_id)
    .bind(snapshot.recorded_date)
    .bind(snapshot.follower_count)
    .bind(snapshot.heart_count)
    .bind(snapshot.video_count)
    .bind(snapshot.daily_growth_followers)
    .bind(snapshot.daily_growth_percent)
    .bind(snapshot.source_trend.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Lists a creator's snapshots, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_creator_stats(
    conn: &mut PgConnection,
    user_id: &str,
) -> Result<Vec<CreatorStatsRow>, DbError> {
    let rows = sqlx::query_as::<_, CreatorStatsRow>(
        "SELECT id, user_id, recorded_date, follower_count, heart_count, video_count, \
                daily_growth_followers, daily_growth_percent, source_trend, created_at \
         FROM creator_stats WHERE user_id = $1 \
         ORDER BY recorded_date DESC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
