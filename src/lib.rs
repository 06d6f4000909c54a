//! Category-aware point clustering for map marker layers.
//!
//! A [`ClusterLayer`] wraps a [`SpatialSource`], groups nearby features that share a
//! category and publishes marker entities (clusters, titles, singles, direction shadows)
//! for whatever renders the map.

pub mod cluster;
pub mod error;
pub mod geojson;
pub mod plugin;
pub mod settings;
pub mod source;
pub mod types;

pub use cluster::{cluster, ClusterLayer, NeighborGroup, RecomputeState, Synthesizer};
pub use error::{ClusterError, Result};
pub use plugin::{
    ClusterLayerResource, ClusterPlugin, ClusterPublishedEvent, SourceChangedEvent,
    ViewportChangedEvent,
};
pub use settings::ClusterConfig;
pub use source::{GeometryExtractor, RTreeSource, SourceChange, SpatialSource};
pub use types::{EntityKind, Feature, FeatureId, OutputEntity, Payload, TempEntity, ViewportState};
