use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use geo::{Centroid, Geometry, Point};

use crate::types::Feature;

/// Picks the point a feature is clustered at. `None` means the feature cannot be grouped.
pub type GeometryFn = Arc<dyn Fn(&Feature) -> Option<Point<f64>> + Send + Sync>;

/// Only point geometries with finite coordinates have a cluster position.
pub fn point_geometry(feature: &Feature) -> Option<Point<f64>> {
    match feature.geometry.as_ref()? {
        Geometry::Point(point) => Some(*point).filter(is_finite),
        _ => None,
    }
}

/// Clusters lines and polygons at their centroid.
pub fn centroid_geometry(feature: &Feature) -> Option<Point<f64>> {
    feature.geometry.as_ref()?.centroid().filter(is_finite)
}

pub fn is_finite(point: &Point<f64>) -> bool {
    point.x().is_finite() && point.y().is_finite()
}

/// Resolves the cluster position of a feature, optionally per category.
#[derive(Clone)]
pub struct GeometryExtractor {
    default: GeometryFn,
    by_category: HashMap<String, GeometryFn>,
}

impl Default for GeometryExtractor {
    fn default() -> Self {
        Self::new(point_geometry)
    }
}

impl fmt::Debug for GeometryExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryExtractor")
            .field("categories", &self.by_category.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl GeometryExtractor {
    pub fn new(default: impl Fn(&Feature) -> Option<Point<f64>> + Send + Sync + 'static) -> Self {
        Self {
            default: Arc::new(default),
            by_category: HashMap::new(),
        }
    }

    /// Overrides extraction for one category.
    pub fn with_category(
        mut self,
        category: impl Into<String>,
        extract: impl Fn(&Feature) -> Option<Point<f64>> + Send + Sync + 'static,
    ) -> Self {
        self.by_category.insert(category.into(), Arc::new(extract));
        self
    }

    /// Custom functions returning non-finite points are treated as returning `None`.
    pub fn extract(&self, feature: &Feature) -> Option<Point<f64>> {
        let extract = feature
            .category()
            .and_then(|category| self.by_category.get(category))
            .unwrap_or(&self.default);
        (**extract)(feature).filter(is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};

    fn square(category: &str) -> Feature {
        Feature::new(
            Some(Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 2.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 0.0, y: 2.0),
            ])),
            Some(category.to_string()),
            None,
        )
    }

    #[test]
    fn default_only_accepts_points() {
        let extractor = GeometryExtractor::default();
        assert_eq!(
            extractor.extract(&Feature::point(3.0, 4.0, "A")),
            Some(Point::new(3.0, 4.0))
        );
        assert_eq!(extractor.extract(&square("A")), None);
        assert_eq!(extractor.extract(&Feature::new(None, None, None)), None);
        assert_eq!(extractor.extract(&Feature::point(f64::NAN, 4.0, "A")), None);
    }

    #[test]
    fn custom_non_finite_points_are_dropped() {
        let extractor = GeometryExtractor::new(|_: &Feature| Some(Point::new(1.0, f64::NAN)));
        assert_eq!(extractor.extract(&Feature::point(1.0, 1.0, "A")), None);
    }

    #[test]
    fn category_override_wins() {
        let extractor = GeometryExtractor::default().with_category("zone", centroid_geometry);
        assert_eq!(extractor.extract(&square("zone")), Some(Point::new(1.0, 1.0)));
        assert_eq!(extractor.extract(&square("other")), None);
    }
}
