//! Shared domain types and pure logic for the Comet roster engine.
//!
//! Everything in this crate is synchronous and free of I/O apart from
//! [`load_app_config`], which reads the process environment.

use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod filter;
pub mod growth;
pub mod policy;
pub mod trends;
pub mod types;

pub use app_config::{AppConfig, StorageConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use filter::{ContextFilter, FilterLayer, FilterVerdict};
pub use growth::{build_snapshot, compute_growth, Growth};
pub use policy::{CometCriteria, FilterPolicy};
pub use trends::{apply_trend_blacklist, normalize_trends};
pub use types::{
    AccountProfile, CandidateVideo, CreatorIdentity, PriorSnapshot, Provenance,
    SearchPage, StatSnapshot,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
