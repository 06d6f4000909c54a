use std::collections::HashMap;
use std::sync::Arc;

use bevy::log::trace;
use crossbeam_channel::{unbounded, Receiver, Sender};
use geo::{Coord, Rect};
use rstar::{RTree, RTreeObject, AABB};

use super::{SourceChange, SpatialSource};
use crate::types::{rect_to_aabb, Feature, FeatureId};

#[derive(Clone, Debug)]
struct IndexedFeature {
    /// Insertion sequence, used to hand results back in source order.
    seq: u64,
    envelope: AABB<[f64; 2]>,
    feature: Arc<Feature>,
}

impl PartialEq for IndexedFeature {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An in-memory feature store backed by an R-tree.
///
/// Features without a finite bounding box (no geometry, NaN coordinates) are kept but
/// never returned by region queries.
#[derive(Debug, Default)]
pub struct RTreeSource {
    tree: RTree<IndexedFeature>,
    features: HashMap<FeatureId, (u64, Arc<Feature>)>,
    next_seq: u64,
    listeners: Vec<Sender<SourceChange>>,
}

impl RTreeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut source = Self::new();
        for feature in features {
            source.store(feature);
        }
        source
    }

    /// Adds a feature, replacing any feature with the same id.
    pub fn insert(&mut self, feature: Feature) -> FeatureId {
        let id = self.store(feature);
        self.notify(SourceChange::Added(id));
        id
    }

    pub fn remove(&mut self, id: FeatureId) -> Option<Arc<Feature>> {
        let removed = self.unstore(id)?;
        self.notify(SourceChange::Removed(id));
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.features.clear();
        self.notify(SourceChange::Cleared);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box of every indexed feature.
    pub fn extent(&self) -> Option<Rect<f64>> {
        if self.tree.size() == 0 {
            return None;
        }
        let envelope = self.tree.root().envelope();
        let (lower, upper) = (envelope.lower(), envelope.upper());
        Some(Rect::new(
            Coord {
                x: lower[0],
                y: lower[1],
            },
            Coord {
                x: upper[0],
                y: upper[1],
            },
        ))
    }

    fn store(&mut self, feature: Feature) -> FeatureId {
        let id = feature.id;
        self.unstore(id);

        let seq = self.next_seq;
        self.next_seq += 1;
        let feature = Arc::new(feature);
        match feature.envelope() {
            Some(envelope) => self.tree.insert(IndexedFeature {
                seq,
                envelope,
                feature: feature.clone(),
            }),
            None => trace!("feature {} has no bounds, not indexed", id),
        }
        self.features.insert(id, (seq, feature));
        id
    }

    fn unstore(&mut self, id: FeatureId) -> Option<Arc<Feature>> {
        let (seq, feature) = self.features.remove(&id)?;
        if let Some(envelope) = feature.envelope() {
            self.tree.remove(&IndexedFeature {
                seq,
                envelope,
                feature: feature.clone(),
            });
        }
        Some(feature)
    }

    fn notify(&mut self, change: SourceChange) {
        self.listeners.retain(|tx| tx.send(change).is_ok());
    }
}

impl SpatialSource for RTreeSource {
    fn query_region(&self, region: &Rect<f64>) -> Vec<Arc<Feature>> {
        let mut hits: Vec<&IndexedFeature> = self
            .tree
            .locate_in_envelope_intersecting(&rect_to_aabb(region))
            .collect();
        hits.sort_unstable_by_key(|hit| hit.seq);
        hits.into_iter().map(|hit| hit.feature.clone()).collect()
    }

    fn subscribe(&mut self) -> Receiver<SourceChange> {
        let (tx, rx) = unbounded();
        self.listeners.push(tx);
        rx
    }
}
