mod extractor;
mod rtree_source;

use std::sync::Arc;

use crossbeam_channel::Receiver;
use geo::Rect;

pub use extractor::*;
pub use rtree_source::*;

use crate::types::{Feature, FeatureId};

/// A change to the feature collection behind a [`SpatialSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceChange {
    Added(FeatureId),
    Removed(FeatureId),
    Cleared,
}

/// Read side of a feature store, as seen by the cluster layer.
///
/// The layer never mutates a source. Whoever owns the features is expected to
/// announce every mutation on the channels handed out by [`SpatialSource::subscribe`].
pub trait SpatialSource {
    /// All features whose bounds intersect `region`, in source order.
    fn query_region(&self, region: &Rect<f64>) -> Vec<Arc<Feature>>;

    /// Asks the source to make `region` available at `resolution`. Sources that load
    /// lazily fetch here and report what they added on the change feed.
    fn load_region(&mut self, _region: &Rect<f64>, _resolution: f64) {}

    /// Opens a new change feed.
    fn subscribe(&mut self) -> Receiver<SourceChange>;
}
