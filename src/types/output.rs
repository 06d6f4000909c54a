use std::sync::Arc;

use geo::Point;

use super::{Feature, Payload};

/// What a synthesized entity represents. Renderers style on this.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    Cluster {
        count: usize,
        members: Vec<Arc<Feature>>,
    },
    ClusterTitle {
        count: usize,
    },
    Single {
        data: Option<Payload>,
    },
    SingleTitle {
        name: String,
    },
    /// Direction marker drawn under a single feature.
    Shadow {
        rotation: f64,
    },
}

impl EntityKind {
    /// The `featureType` tag used when the entity is handed to a renderer.
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Cluster { .. } => "cluster",
            EntityKind::ClusterTitle { .. } => "clusterTitle",
            EntityKind::Single { .. } => "single",
            EntityKind::SingleTitle { .. } => "singleTitle",
            EntityKind::Shadow { .. } => "shadow",
        }
    }
}

/// A point entity produced by one clustering pass. Never patched, only replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputEntity {
    pub position: Point<f64>,
    pub category: String,
    pub kind: EntityKind,
}

impl OutputEntity {
    pub fn new(position: Point<f64>, category: &str, kind: EntityKind) -> Self {
        Self {
            position,
            category: category.to_string(),
            kind,
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self.kind {
            EntityKind::Cluster { count, .. } | EntityKind::ClusterTitle { count } => Some(count),
            _ => None,
        }
    }
}

/// An ephemeral overlay point pushed from outside the clustering pass,
/// e.g. the small circles drawn around an expanded cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct TempEntity {
    pub position: Point<f64>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl TempEntity {
    pub fn new(position: Point<f64>) -> Self {
        Self {
            position,
            properties: serde_json::Map::new(),
        }
    }
}
