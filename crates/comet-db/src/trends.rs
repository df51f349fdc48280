//! Database operations for the `daily_trends` table.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;

use crate::DbError;

/// A row from the `daily_trends` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyTrendRow {
    pub id: i64,
    pub trend_keyword: String,
    pub discovered_at: NaiveDate,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
}

/// Records the trends selected on `date`, keyed by `(keyword, date)`.
///
/// Re-recording a keyword on the same date only updates its rank. Returns the
/// number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any upsert fails.
pub async fn upsert_daily_trends(
    conn: &mut PgConnection,
    date: NaiveDate,
    trends: &[(String, i32)],
) -> Result<u64, DbError> {
    let mut written = 0u64;
    for (keyword, rank) in trends {
        let result = sqlx::query(
            "INSERT INTO daily_trends (trend_keyword, discovered_at, rank) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (trend_keyword, discovered_at) DO UPDATE SET rank = EXCLUDED.rank",
        )
        .bind(keyword)
        .bind(date)
        .bind(rank)
        .execute(&mut *conn)
        .await?;
        written += result.rows_affected();
    }
    Ok(written)
}

/// Lists the trends recorded on `date`, best rank first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_daily_trends(
    conn: &mut PgConnection,
    date: NaiveDate,
) -> Result<Vec<DailyTrendRow>, DbError> {
    let rows = sqlx::query_as::<_, DailyTrendRow>(
        "SELECT id, trend_keyword, discovered_at, rank, created_at \
         FROM daily_trends WHERE discovered_at = $1 \
         ORDER BY rank",
    )
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
