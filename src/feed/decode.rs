//! Feed payload decoding: optional gzip, then GeoJSON.
//!
//! The feed is published as a `.gz` file but the cache may also hold plain
//! JSON, so compression is sniffed from the magic bytes rather than trusted
//! from a header or filename. `decode_features(gzip(p))` and
//! `decode_features(p)` are equivalent.

use std::io::Read;

use flate2::read::GzDecoder;

use super::error::FeedError;
use super::types::{FeatureCollection, LocationEntity};

/// First two bytes of every gzip stream (RFC 1952).
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decode raw feed bytes into location entities, preserving feature order.
pub fn decode_features(bytes: &[u8]) -> Result<Vec<LocationEntity>, FeedError> {
    let json = if is_gzipped(bytes) {
        let mut decoder = GzDecoder::new(bytes);
        let mut inflated = Vec::new();
        decoder
            .read_to_end(&mut inflated)
            .map_err(FeedError::DecompressionFailed)?;
        inflated
    } else {
        bytes.to_vec()
    };

    let collection: FeatureCollection = serde_json::from_slice(&json)?;
    tracing::debug!(
        kind = %collection.kind,
        features = collection.features.len(),
        "decoded restaurant feed"
    );

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let (Some(latitude), Some(longitude)) =
                (feature.geometry.latitude(), feature.geometry.longitude())
            else {
                return Err(FeedError::MalformedPayload(format!(
                    "feature {index} is missing a coordinate pair"
                )));
            };
            Ok(LocationEntity {
                latitude,
                longitude,
                name: feature.properties.name,
                postcode: feature.properties.postcode,
            })
        })
        .collect()
}

fn is_gzipped(bytes: &[u8]) -> bool {
    bytes.len() >= GZIP_MAGIC.len() && bytes[..GZIP_MAGIC.len()] == GZIP_MAGIC
}
