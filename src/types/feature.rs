use std::fmt;

use geo::{BoundingRect, Geometry, Point};
use rstar::AABB;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a feature for the lifetime of its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub Uuid);

impl FeatureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The marker model attached to a feature.
///
/// Only `name` and `rotation` are read by the clustering layer, everything else is
/// carried through untouched so renderers can get at it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Heading in degrees. `Some(0.0)` is a real heading, not a missing one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Payload {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// The display name, if there is one worth showing.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Option<Geometry<f64>>,
    /// Grouping category, read from the `type` property.
    pub category: Option<String>,
    pub data: Option<Payload>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry<f64>>, category: Option<String>, data: Option<Payload>) -> Self {
        Self {
            id: FeatureId::new(),
            geometry,
            category,
            data,
        }
    }

    /// Shorthand for a point feature, which is what most marker layers hold.
    pub fn point(x: f64, y: f64, category: impl Into<String>) -> Self {
        Self::new(
            Some(Geometry::Point(Point::new(x, y))),
            Some(category.into()),
            None,
        )
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Bounding box used to place the feature in a spatial index. `None` when the
    /// geometry is missing or has non-finite coordinates.
    pub fn envelope(&self) -> Option<AABB<[f64; 2]>> {
        let bbox = self.geometry.as_ref()?.bounding_rect()?;
        let corners = [bbox.min().x, bbox.min().y, bbox.max().x, bbox.max().y];
        if !corners.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some(AABB::from_corners(
            [bbox.min().x, bbox.min().y],
            [bbox.max().x, bbox.max().y],
        ))
    }
}
