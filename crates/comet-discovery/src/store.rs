//! The roster store seam and its Postgres implementation.
//!
//! A *phase* unit is a database transaction. An *item* unit is a savepoint
//! inside the open phase, so a failed item rolls back only its own writes.
//! Every data operation requires an open phase.

use async_trait::async_trait;
use chrono::NaiveDate;
use comet_core::{CreatorIdentity, PriorSnapshot, Provenance, StatSnapshot};
use comet_db::{RosterEntry, StaleCreator};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::error::StoreError;

const ITEM_SAVEPOINT: &str = "comet_item";

#[async_trait]
pub trait RosterStore: Send {
    async fn begin_phase(&mut self) -> Result<(), StoreError>;
    async fn commit_phase(&mut self) -> Result<(), StoreError>;
    /// Rolls back the open phase. A no-op when none is open.
    async fn abort_phase(&mut self) -> Result<(), StoreError>;

    async fn begin_item(&mut self) -> Result<(), StoreError>;
    async fn commit_item(&mut self) -> Result<(), StoreError>;
    async fn abort_item(&mut self) -> Result<(), StoreError>;

    async fn upsert_creator(
        &mut self,
        identity: &CreatorIdentity,
        provenance: &Provenance,
    ) -> Result<(), StoreError>;

    async fn prior_snapshot(
        &mut self,
        user_id: &str,
        before: NaiveDate,
    ) -> Result<Option<PriorSnapshot>, StoreError>;

    async fn upsert_snapshot(&mut self, snapshot: &StatSnapshot) -> Result<(), StoreError>;

    async fn upsert_trends(
        &mut self,
        date: NaiveDate,
        trends: &[(String, i32)],
    ) -> Result<(), StoreError>;

    async fn list_roster(&mut self) -> Result<Vec<RosterEntry>, StoreError>;

    /// Returns `false` if the creator no longer exists.
    async fn update_avatar(&mut self, user_id: &str, avatar_url: &str)
        -> Result<bool, StoreError>;

    async fn evict_stale(&mut self, cutoff: NaiveDate) -> Result<Vec<StaleCreator>, StoreError>;
}

/// Hands out independent store handles, one per worker.
#[async_trait]
pub trait StoreSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RosterStore>, StoreError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// A store handle over one pooled connection held for the open phase.
///
/// Dropping the handle with a phase still open rolls it back.
pub struct PgRosterStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    item_open: bool,
}

impl PgRosterStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            item_open: false,
        }
    }

    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(StoreError::NoUnitOfWork("phase")),
        }
    }

    async fn savepoint_statement(&mut self, sql: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        sqlx::query(sql).execute(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl RosterStore for PgRosterStore {
    async fn begin_phase(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::UnitAlreadyOpen("phase"));
        }
        self.tx = Some(self.pool.begin().await?);
        self.item_open = false;
        Ok(())
    }

    async fn commit_phase(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::NoUnitOfWork("phase"))?;
        self.item_open = false;
        tx.commit().await?;
        Ok(())
    }

    async fn abort_phase(&mut self) -> Result<(), StoreError> {
        self.item_open = false;
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn begin_item(&mut self) -> Result<(), StoreError> {
        if self.item_open {
            return Err(StoreError::UnitAlreadyOpen("item"));
        }
        self.savepoint_statement(&format!("SAVEPOINT {ITEM_SAVEPOINT}"))
            .await?;
        self.item_open = true;
        Ok(())
    }

    async fn commit_item(&mut self) -> Result<(), StoreError> {
        if !self.item_open {
            return Err(StoreError::NoUnitOfWork("item"));
        }
        self.item_open = false;
        self.savepoint_statement(&format!("RELEASE SAVEPOINT {ITEM_SAVEPOINT}"))
            .await
    }

    async fn abort_item(&mut self) -> Result<(), StoreError> {
        if !self.item_open {
            return Err(StoreError::NoUnitOfWork("item"));
        }
        self.item_open = false;
        // ROLLBACK TO keeps the savepoint alive; release it so savepoints do
        // not pile up across items.
        self.savepoint_statement(&format!("ROLLBACK TO SAVEPOINT {ITEM_SAVEPOINT}"))
            .await?;
        self.savepoint_statement(&format!("RELEASE SAVEPOINT {ITEM_SAVEPOINT}"))
            .await
    }

    async fn upsert_creator(
        &mut self,
        identity: &CreatorIdentity,
        provenance: &Provenance,
    ) -> Result<(), StoreError> {
        comet_db::upsert_creator(self.conn()?, identity, provenance).await?;
        Ok(())
    }

    async fn prior_snapshot(
        &mut self,
        user_id: &str,
        before: NaiveDate,
    ) -> Result<Option<PriorSnapshot>, StoreError> {
        Ok(comet_db::get_prior_snapshot(self.conn()?, user_id, before).await?)
    }

    async fn upsert_snapshot(&mut self, snapshot: &StatSnapshot) -> Result<(), StoreError> {
        comet_db::upsert_snapshot(self.conn()?, snapshot).await?;
        Ok(())
    }

    async fn upsert_trends(
        &mut self,
        date: NaiveDate,
        trends: &[(String, i32)],
    ) -> Result<(), StoreError> {
        comet_db::upsert_daily_trends(self.conn()?, date, trends).await?;
        Ok(())
    }

    async fn list_roster(&mut self) -> Result<Vec<RosterEntry>, StoreError> {
        Ok(comet_db::list_roster(self.conn()?).await?)
    }

    async fn update_avatar(
        &mut self,
        user_id: &str,
        avatar_url: &str,
    ) -> Result<bool, StoreError> {
        Ok(comet_db::update_avatar_url(self.conn()?, user_id, avatar_url).await?)
    }

    async fn evict_stale(&mut self, cutoff: NaiveDate) -> Result<Vec<StaleCreator>, StoreError> {
        Ok(comet_db::evict_stale(self.conn()?, cutoff).await?)
    }
}

/// Opens [`PgRosterStore`] handles over a shared pool.
#[derive(Clone)]
pub struct PgStoreSource {
    pool: PgPool,
}

impl PgStoreSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreSource for PgStoreSource {
    async fn open(&self) -> Result<Box<dyn RosterStore>, StoreError> {
        Ok(Box::new(PgRosterStore::new(self.pool.clone())))
    }
}
