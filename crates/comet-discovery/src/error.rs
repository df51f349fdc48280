use comet_db::DbError;
use comet_tikhub::TikHubError;
use thiserror::Error;

/// Failure of an external data source (search, profile, trending).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    TikHub(#[from] TikHubError),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the roster store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("no {0} unit of work is open")]
    NoUnitOfWork(&'static str),
    #[error("a {0} unit of work is already open")]
    UnitAlreadyOpen(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A phase-level failure: the phase's unit of work was rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
