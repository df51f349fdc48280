//! Discovery, Roll Call, and Cleanup orchestration for the Comet roster.
//!
//! [`DiscoveryEngine`] drives the pure filters from `comet-core`, the
//! classifier, and the collaborators behind the traits in [`sources`],
//! [`store`], and [`avatar`].

pub mod avatar;
pub mod context;
pub mod engine;
pub mod error;
pub mod sources;
pub mod stats;
pub mod store;

mod discovery;
mod pacing;
mod roll_call;

pub use avatar::{AvatarCache, AvatarError, SupabaseAvatarStore};
pub use context::RunContext;
pub use engine::{Collaborators, DiscoveryEngine, EngineConfig, RunOptions};
pub use error::{EngineError, SourceError, StoreError};
pub use sources::{ProfileFetcher, TrendSource, VideoSearch};
pub use stats::{AvatarStats, FilterStats, RollCallStats, RunSummary};
pub use store::{PgRosterStore, PgStoreSource, RosterStore, StoreSource};
