//! Persistent cache for the feed: the conditional-request validator, a copy
//! of the last good payload, and a log of fetch attempts.
//!
//! The validator survives process restarts so the very first request of a new
//! run can still be conditional; it is cleared whenever a fetch or decode
//! fails so the next attempt downloads from scratch.

pub mod error;
pub mod schema;
pub mod store;
pub mod types;

pub use error::CacheError;
pub use store::{CacheStore, SqliteCacheStore};
pub use types::{CacheSummary, FetchRun, FetchRunOutcome};
