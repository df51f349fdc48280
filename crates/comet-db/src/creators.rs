//! Database operations for the `creators` table.

use chrono::{DateTime, NaiveDate, Utc};
use comet_core::{CreatorIdentity, Provenance};
use sqlx::PgConnection;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `creators` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CreatorRow {
    pub user_id: String,
    pub handle: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub signature: String,
    pub last_updated_at: DateTime<Utc>,
    pub discovered_via_trend: Option<String>,
    pub breakout_video_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The slice of a creator that Roll Call and avatar backfill need.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RosterEntry {
    pub user_id: String,
    pub handle: String,
    pub avatar_url: Option<String>,
}

/// A creator removed by [`evict_stale`].
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StaleCreator {
    pub user_id: String,
    pub handle: String,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Inserts a creator or refreshes its identity fields.
///
/// `discovered_via_trend` and `breakout_video_id` are only written by the
/// INSERT branch; the conflict branch leaves them untouched so the first
/// discovery is preserved no matter how often the creator is re-encountered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_creator(
    conn: &mut PgConnection,
    identity: &CreatorIdentity,
    provenance: &Provenance,
) -> Result<CreatorRow, DbError> {
    let row = sqlx::query_as::<_, CreatorRow>(
        "INSERT INTO creators \
             (user_id, handle, nickname, avatar_url, signature, last_updated_at, \
              discovered_via_trend, breakout_video_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (user_id) DO UPDATE SET \
             handle = EXCLUDED.handle, \
             nickname = EXCLUDED.nickname, \
             avatar_url = EXCLUDED.avatar_url, \
             signature = EXCLUDED.signature, \
             last_updated_at = EXCLUDED.last_updated_at \
         RETURNING user_id, handle, nickname, avatar_url, signature, last_updated_at, \
                   discovered_via_trend, breakout_video_id, created_at",
    )
    .bind(&identity.user_id)
    .bind(&identity.handle)
    .bind(&identity.nickname)
    .bind(identity.avatar_url.as_deref())
    .bind(&identity.signature)
    .bind(identity.last_updated_at)
    .bind(provenance.discovered_via_trend.as_deref())
    .bind(provenance.breakout_video_id.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Fetches a single creator by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no creator has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_creator(conn: &mut PgConnection, user_id: &str) -> Result<CreatorRow, DbError> {
    sqlx::query_as::<_, CreatorRow>(
        "SELECT user_id, handle, nickname, avatar_url, signature, last_updated_at, \
                discovered_via_trend, breakout_video_id, created_at \
         FROM creators WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns every creator on the roster, ordered by handle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_roster(conn: &mut PgConnection) -> Result<Vec<RosterEntry>, DbError> {
    let rows = sqlx::query_as::<_, RosterEntry>(
        "SELECT user_id, handle, avatar_url FROM creators ORDER BY handle, user_id",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Replaces the stored avatar reference. Returns `false` if the creator no
/// longer exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_avatar_url(
    conn: &mut PgConnection,
    user_id: &str,
    avatar_url: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query("UPDATE creators SET avatar_url = $1 WHERE user_id = $2")
        .bind(avatar_url)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes every creator with no snapshot on or after `cutoff`, together with
/// all of its snapshots.
///
/// Runs as a single statement so the selection and both deletes see the same
/// snapshot: snapshots are removed first, then their creators. A creator whose
/// latest snapshot falls exactly on `cutoff` is kept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn evict_stale(
    conn: &mut PgConnection,
    cutoff: NaiveDate,
) -> Result<Vec<StaleCreator>, DbError> {
    let rows = sqlx::query_as::<_, StaleCreator>(
        "WITH stale AS ( \
             SELECT c.user_id FROM creators c \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM creator_stats cs \
                 WHERE cs.user_id = c.user_id AND cs.recorded_date >= $1 \
             ) \
         ), purged_stats AS ( \
             DELETE FROM creator_stats cs USING stale \
             WHERE cs.user_id = stale.user_id \
             RETURNING cs.id \
         ) \
         DELETE FROM creators c USING stale \
         WHERE c.user_id = stale.user_id \
         RETURNING c.user_id, c.handle",
    )
    .bind(cutoff)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
