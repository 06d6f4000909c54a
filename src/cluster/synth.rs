use std::sync::Arc;

use geo::Point;

use super::NeighborGroup;
use crate::settings::ClusterConfig;
use crate::source::GeometryExtractor;
use crate::types::{EntityKind, Feature, OutputEntity};

/// Turns neighbor groups into the entities a marker layer draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Synthesizer {
    pub cluster_title_visible: bool,
    pub single_title_visible: bool,
    pub direction_visible: bool,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::from(&ClusterConfig::default())
    }
}

impl From<&ClusterConfig> for Synthesizer {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            cluster_title_visible: config.cluster_title_visible,
            single_title_visible: config.single_title_visible,
            direction_visible: config.direction_visible,
        }
    }
}

impl Synthesizer {
    /// Emits, in order: `cluster` then `clusterTitle` for groups of two or more,
    /// `single` then `singleTitle` then `shadow` for a lone feature.
    ///
    /// Members without a cluster position are dropped first and take no part in the
    /// centroid. A group left empty yields nothing.
    pub fn synthesize(&self, group: NeighborGroup, extractor: &GeometryExtractor) -> Vec<OutputEntity> {
        let NeighborGroup { category, members } = group;
        let positioned: Vec<(Arc<Feature>, Point<f64>)> = members
            .into_iter()
            .filter_map(|member| extractor.extract(&member).map(|point| (member, point)))
            .collect();
        let Some(centroid) = centroid(positioned.iter().map(|(_, point)| *point)) else {
            return Vec::new();
        };

        let mut entities = Vec::with_capacity(2);
        if positioned.len() > 1 {
            let count = positioned.len();
            entities.push(OutputEntity::new(
                centroid,
                &category,
                EntityKind::Cluster {
                    count,
                    members: positioned.into_iter().map(|(member, _)| member).collect(),
                },
            ));
            if self.cluster_title_visible {
                entities.push(OutputEntity::new(
                    centroid,
                    &category,
                    EntityKind::ClusterTitle { count },
                ));
            }
            return entities;
        }

        let data = positioned[0].0.data.clone();
        let name = data
            .as_ref()
            .and_then(|data| data.display_name())
            .map(str::to_string);
        let rotation = data.as_ref().and_then(|data| data.rotation);

        entities.push(OutputEntity::new(centroid, &category, EntityKind::Single { data }));
        if let (true, Some(name)) = (self.single_title_visible, name) {
            entities.push(OutputEntity::new(
                centroid,
                &category,
                EntityKind::SingleTitle { name },
            ));
        }
        if let (true, Some(rotation)) = (self.direction_visible, rotation) {
            entities.push(OutputEntity::new(
                centroid,
                &category,
                EntityKind::Shadow { rotation },
            ));
        }
        entities
    }
}

/// Arithmetic mean of the points, `None` when there are none.
pub fn centroid(points: impl IntoIterator<Item = Point<f64>>) -> Option<Point<f64>> {
    let (sum, n) = points
        .into_iter()
        .fold((Point::new(0.0, 0.0), 0usize), |(sum, n), point| (sum + point, n + 1));
    (n > 0).then(|| sum / n as f64)
}
