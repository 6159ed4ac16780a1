//! Viewport annotation reconciliation.
//!
//! Given the visible map region and the full candidate set, compute the
//! minimal add/remove delta against what is already shown. Reconciliation
//! only runs when zoomed in far enough; above [`ZOOM_SPAN_MAX`] every
//! annotation is removed so a country-level view is not buried under
//! thousands of markers.

/// Largest latitude span (degrees) at which annotations are shown.
pub const ZOOM_SPAN_MAX: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSpan {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl CoordinateSpan {
    /// Country-level overview.
    pub const HIGH: CoordinateSpan = CoordinateSpan {
        latitude_delta: 14.83,
        longitude_delta: 12.22,
    };
    /// Neighbourhood-level view, the default for nearby queries.
    pub const MIDDLE: CoordinateSpan = CoordinateSpan {
        latitude_delta: 0.025,
        longitude_delta: 0.025,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateRegion {
    pub center: GeoCoordinate,
    pub span: CoordinateSpan,
}

impl CoordinateRegion {
    /// The whole United Kingdom; the map opens here.
    pub const UK: CoordinateRegion = CoordinateRegion {
        center: GeoCoordinate {
            latitude: 54.093409,
            longitude: -2.89479,
        },
        span: CoordinateSpan::HIGH,
    };

    pub fn new(center: GeoCoordinate, span: CoordinateSpan) -> Self {
        Self { center, span }
    }

    /// Whether the coordinate lies inside this region (edges inclusive).
    pub fn contains(&self, coordinate: GeoCoordinate) -> bool {
        (coordinate.latitude - self.center.latitude).abs() <= self.span.latitude_delta / 2.0
            && (coordinate.longitude - self.center.longitude).abs()
                <= self.span.longitude_delta / 2.0
    }
}

/// Anything that can be placed on the map.
pub trait Annotation {
    fn coordinate(&self) -> GeoCoordinate;
}

/// The minimal change turning the shown set into the wanted set.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDelta<T> {
    pub to_add: Vec<T>,
    pub to_remove: Vec<T>,
}

impl<T> AnnotationDelta<T> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Reconcile the shown annotations against the visible region.
///
/// Shown items whose coordinate left the region are removed; candidates
/// inside the region that are not already shown are added. With the region
/// zoomed out past [`ZOOM_SPAN_MAX`] everything is removed and nothing added.
/// Applying the delta and reconciling again yields an empty delta.
pub fn reconcile<T>(visible: CoordinateRegion, candidates: &[T], shown: &[T]) -> AnnotationDelta<T>
where
    T: Annotation + Clone + PartialEq,
{
    if visible.span.latitude_delta > ZOOM_SPAN_MAX {
        return AnnotationDelta {
            to_add: Vec::new(),
            to_remove: shown.to_vec(),
        };
    }

    let to_remove: Vec<T> = shown
        .iter()
        .filter(|item| !visible.contains(item.coordinate()))
        .cloned()
        .collect();

    let to_add: Vec<T> = candidates
        .iter()
        .filter(|item| visible.contains(item.coordinate()) && !shown.contains(item))
        .cloned()
        .collect();

    AnnotationDelta { to_add, to_remove }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Pin {
        name: &'static str,
        at: GeoCoordinate,
    }

    impl Annotation for Pin {
        fn coordinate(&self) -> GeoCoordinate {
            self.at
        }
    }

    fn pin(name: &'static str, latitude: f64, longitude: f64) -> Pin {
        Pin {
            name,
            at: GeoCoordinate {
                latitude,
                longitude,
            },
        }
    }

    fn viewport(latitude: f64, longitude: f64) -> CoordinateRegion {
        CoordinateRegion::new(
            GeoCoordinate {
                latitude,
                longitude,
            },
            CoordinateSpan::MIDDLE,
        )
    }

    /// Apply a delta the way the presentation layer would.
    fn apply(shown: &[Pin], delta: &AnnotationDelta<Pin>) -> Vec<Pin> {
        let mut next: Vec<Pin> = shown
            .iter()
            .filter(|p| !delta.to_remove.contains(p))
            .cloned()
            .collect();
        next.extend(delta.to_add.iter().cloned());
        next
    }

    #[test]
    fn test_adds_candidates_inside_viewport() {
        let visible = viewport(54.09, -2.89);
        let candidates = [pin("inside", 54.09, -2.89), pin("far", 51.5, -0.12)];

        let delta = reconcile(visible, &candidates, &[]);

        assert_eq!(delta.to_add, vec![candidates[0].clone()]);
        assert!(delta.to_remove.is_empty());
    }

    #[test]
    fn test_removes_items_that_left_the_viewport() {
        let visible = viewport(54.09, -2.89);
        let shown = [pin("gone", 51.5, -0.12), pin("stays", 54.09, -2.89)];

        let delta = reconcile(visible, &[], &shown);

        assert_eq!(delta.to_remove, vec![shown[0].clone()]);
        assert!(delta.to_add.is_empty());
    }

    #[test]
    fn test_shown_candidates_are_not_added_again() {
        let visible = viewport(54.09, -2.89);
        let items = [pin("here", 54.09, -2.89)];

        let delta = reconcile(visible, &items, &items);

        assert!(delta.is_empty());
    }

    #[test]
    fn test_zoomed_out_clears_everything() {
        let visible = CoordinateRegion::new(
            GeoCoordinate {
                latitude: 54.09,
                longitude: -2.89,
            },
            CoordinateSpan {
                latitude_delta: ZOOM_SPAN_MAX + 0.01,
                longitude_delta: 0.06,
            },
        );
        let candidates = [pin("a", 54.09, -2.89)];
        let shown = [pin("b", 54.091, -2.891), pin("c", 54.092, -2.892)];

        let delta = reconcile(visible, &candidates, &shown);

        assert!(delta.to_add.is_empty());
        assert_eq!(delta.to_remove, shown.to_vec());
    }

    #[test]
    fn test_threshold_span_is_still_active() {
        // "At or below" the threshold reconciles normally.
        let visible = CoordinateRegion::new(
            GeoCoordinate {
                latitude: 54.09,
                longitude: -2.89,
            },
            CoordinateSpan {
                latitude_delta: ZOOM_SPAN_MAX,
                longitude_delta: ZOOM_SPAN_MAX,
            },
        );
        let candidates = [pin("a", 54.09, -2.89)];

        let delta = reconcile(visible, &candidates, &[]);

        assert_eq!(delta.to_add.len(), 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let visible = viewport(54.09, -2.89);
        let candidates = [
            pin("a", 54.09, -2.89),
            pin("b", 54.095, -2.885),
            pin("far", 51.5, -0.12),
        ];
        let shown = [pin("stale", 51.5, -0.12)];

        let delta = reconcile(visible, &candidates, &shown);
        let next_shown = apply(&shown, &delta);

        let second = reconcile(visible, &candidates, &next_shown);
        assert!(second.is_empty(), "second pass produced {second:?}");
    }

    #[test]
    fn test_region_contains_boundaries() {
        let region = viewport(54.0, -2.0);
        // Just inside half the span on the latitude axis.
        assert!(region.contains(GeoCoordinate {
            latitude: 54.012,
            longitude: -2.0,
        }));
        assert!(!region.contains(GeoCoordinate {
            latitude: 54.014,
            longitude: -2.0,
        }));
    }

    #[test]
    fn test_uk_region_covers_both_ends_of_the_country() {
        assert!(CoordinateRegion::UK.contains(GeoCoordinate {
            latitude: 51.5074,
            longitude: -0.1278, // London
        }));
        assert!(CoordinateRegion::UK.contains(GeoCoordinate {
            latitude: 55.9533,
            longitude: -3.1883, // Edinburgh
        }));
    }

    #[test]
    fn test_pin_names_survive_cloning() {
        let visible = viewport(54.09, -2.89);
        let candidates = [pin("named", 54.09, -2.89)];
        let delta = reconcile(visible, &candidates, &[]);
        assert_eq!(delta.to_add[0].name, "named");
    }
}
