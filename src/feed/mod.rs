//! Restaurant feed pipeline: conditional fetch and gzip/GeoJSON decode.

pub mod decode;
pub mod error;
pub mod fetch;
pub mod types;

pub use decode::decode_features;
pub use error::FeedError;
pub use fetch::{FeedFetcher, FeedGateway, FetchOutcome};
pub use types::LocationEntity;
