use serde::Deserialize;

/// One participating restaurant, as decoded from the feed.
///
/// Immutable after decoding; the presentation layer maps these into map
/// annotations without ever mutating them.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationEntity {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub postcode: String,
}

/// Top-level GeoJSON document: `{"type": ..., "features": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    pub properties: FeatureProperties,
    pub geometry: FeatureGeometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureProperties {
    pub name: String,
    pub postcode: String,
}

/// GeoJSON stores coordinates as `[longitude, latitude]`, so latitude is the
/// *last* element and longitude the *first*. The feed relies on that order.
#[derive(Debug, Deserialize)]
pub(crate) struct FeatureGeometry {
    pub coordinates: Vec<f64>,
}

impl FeatureGeometry {
    pub(crate) fn latitude(&self) -> Option<f64> {
        self.coordinates.last().copied()
    }

    pub(crate) fn longitude(&self) -> Option<f64> {
        self.coordinates.first().copied()
    }
}
