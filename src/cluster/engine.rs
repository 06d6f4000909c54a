use std::collections::HashSet;
use std::sync::Arc;

use bevy::log::trace;

use crate::source::{GeometryExtractor, SpatialSource};
use crate::types::{buffer_point, map_distance, Feature, FeatureId};

/// Features of one category gathered around a single seed during a pass.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborGroup {
    pub category: String,
    pub members: Vec<Arc<Feature>>,
}

impl NeighborGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Partitions `features` into neighbor groups.
///
/// Features are visited in the order given. Each unvisited feature seeds a group made of
/// every not yet grouped feature of the same category inside the seed's point buffered
/// by `distance * resolution`. Expansion is a single hop: members' own neighborhoods are
/// not searched, so two features can end up in different groups even when a chain of
/// close features links them.
///
/// Features without a cluster position, without a category, or whose category is
/// rejected by `is_enabled` produce no group.
pub fn cluster<S, F>(
    source: &S,
    extractor: &GeometryExtractor,
    features: &[Arc<Feature>],
    distance: f64,
    resolution: f64,
    is_enabled: F,
) -> Vec<NeighborGroup>
where
    S: SpatialSource + ?Sized,
    F: Fn(&str) -> bool,
{
    let reach = map_distance(distance, resolution);
    let mut clustered: HashSet<FeatureId> = HashSet::with_capacity(features.len());
    let mut groups = Vec::new();

    for feature in features {
        if clustered.contains(&feature.id) {
            continue;
        }
        let Some(point) = extractor.extract(feature) else {
            trace!("feature {} has no cluster position, skipped", feature.id);
            continue;
        };
        let Some(category) = feature.category() else {
            trace!("feature {} has no category, skipped", feature.id);
            continue;
        };
        if !is_enabled(category) {
            continue;
        }

        let region = buffer_point(point, reach);
        let mut members: Vec<Arc<Feature>> = source
            .query_region(&region)
            .into_iter()
            .filter(|neighbor| neighbor.category() == Some(category) && clustered.insert(neighbor.id))
            .collect();
        // The seed normally finds itself; this covers extractors that place the point
        // outside the indexed bounds.
        if clustered.insert(feature.id) {
            members.insert(0, feature.clone());
        }

        groups.push(NeighborGroup {
            category: category.to_string(),
            members,
        });
    }

    groups
}
