use std::sync::Arc;

use bevy::log::{debug, trace};
use crossbeam_channel::Receiver;
use geo::Rect;

use super::{cluster, Synthesizer};
use crate::error::Result;
use crate::settings::{validate_distance, validate_resolution, ClusterConfig};
use crate::source::{GeometryExtractor, SourceChange, SpatialSource};
use crate::types::{OutputEntity, TempEntity, ViewportState};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecomputeState {
    #[default]
    Idle,
    Clustering,
    Published,
}

/// A clustered view over a [`SpatialSource`].
///
/// The layer reruns clustering when the map asks for a different region, after a
/// configuration change, or once the source has reported a change. Each run replaces
/// the published entities wholesale.
#[derive(Debug)]
pub struct ClusterLayer<S> {
    source: S,
    changes: Receiver<SourceChange>,
    extractor: GeometryExtractor,
    config: ClusterConfig,
    viewport: Option<ViewportState>,
    state: RecomputeState,
    invalidated: bool,
    published: Arc<Vec<OutputEntity>>,
    temporary: Option<Vec<TempEntity>>,
    generation: u64,
}

impl<S: SpatialSource> ClusterLayer<S> {
    pub fn new(mut source: S) -> Self {
        let changes = source.subscribe();
        Self {
            source,
            changes,
            extractor: GeometryExtractor::default(),
            config: ClusterConfig::default(),
            viewport: None,
            state: RecomputeState::Idle,
            invalidated: false,
            published: Arc::new(Vec::new()),
            temporary: None,
            generation: 0,
        }
    }

    pub fn with_extractor(mut self, extractor: GeometryExtractor) -> Self {
        self.extractor = extractor;
        self.invalidated = true;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the wrapped source. Mutations reach the layer through the
    /// source's change feed.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn distance(&self) -> f64 {
        self.config.distance
    }

    pub fn viewport(&self) -> Option<&ViewportState> {
        self.viewport.as_ref()
    }

    pub fn state(&self) -> RecomputeState {
        self.state
    }

    /// Number of passes published so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The entities of the last pass. The `Arc` is swapped, never written through.
    pub fn entities(&self) -> &Arc<Vec<OutputEntity>> {
        &self.published
    }

    pub fn temp_entities(&self) -> &[TempEntity] {
        self.temporary.as_deref().unwrap_or_default()
    }

    /// True when the next `refresh` or `load_region` will recompute regardless of region.
    pub fn is_stale(&self) -> bool {
        self.invalidated || !self.changes.is_empty()
    }

    pub fn set_config(&mut self, config: ClusterConfig) -> Result<()> {
        config.validate()?;
        if config != self.config {
            self.config = config;
            self.invalidated = true;
        }
        Ok(())
    }

    pub fn set_distance(&mut self, distance: f64) -> Result<()> {
        validate_distance(distance)?;
        if distance != self.config.distance {
            self.config.distance = distance;
            self.invalidated = true;
        }
        Ok(())
    }

    pub fn set_category_visible(&mut self, category: &str, visible: bool) {
        if self.config.categories.insert(category.to_string(), visible) != Some(visible) {
            self.invalidated = true;
        }
    }

    pub fn set_cluster_title_visible(&mut self, visible: bool) {
        Self::toggle(&mut self.config.cluster_title_visible, visible, &mut self.invalidated);
    }

    pub fn set_single_title_visible(&mut self, visible: bool) {
        Self::toggle(&mut self.config.single_title_visible, visible, &mut self.invalidated);
    }

    pub fn set_direction_visible(&mut self, visible: bool) {
        Self::toggle(&mut self.config.direction_visible, visible, &mut self.invalidated);
    }

    fn toggle(flag: &mut bool, visible: bool, invalidated: &mut bool) {
        if *flag != visible {
            *flag = visible;
            *invalidated = true;
        }
    }

    /// Out-of-band notice that the features changed, for sources that cannot report it themselves.
    pub fn notify_source_changed(&mut self) {
        self.invalidated = true;
    }

    /// Called by the map whenever it needs features for `region`.
    ///
    /// Returns whether a new set of entities was published. An identical region with
    /// nothing invalidated is a no-op, even if the resolution moved.
    pub fn load_region(&mut self, region: Rect<f64>, resolution: f64) -> Result<bool> {
        validate_resolution(resolution)?;
        self.source.load_region(&region, resolution);
        let region_changed = self.viewport.is_none_or(|viewport| viewport.region != region);
        if !region_changed && !self.is_stale() {
            trace!("region unchanged, keeping generation {}", self.generation);
            return Ok(false);
        }
        self.viewport = Some(ViewportState::new(region, resolution));
        self.recompute();
        Ok(true)
    }

    /// Recomputes with the stored viewport. Does nothing until a region has been loaded.
    pub fn refresh(&mut self) -> bool {
        if self.viewport.is_none() {
            return false;
        }
        self.recompute();
        true
    }

    /// Pushes a batch of temporary entities, dropping the previous batch. Returns the
    /// batch that was replaced.
    pub fn add_temp_entities(&mut self, batch: Vec<TempEntity>) -> Option<Vec<TempEntity>> {
        self.temporary.replace(batch)
    }

    fn recompute(&mut self) {
        let Some(viewport) = self.viewport else {
            return;
        };
        self.state = RecomputeState::Clustering;
        self.changes.try_iter().for_each(drop);
        self.temporary = None;

        let features = self.source.query_region(&viewport.region);
        trace!(
            "clustering within {} map units",
            viewport.map_distance(self.config.distance)
        );
        let groups = cluster(
            &self.source,
            &self.extractor,
            &features,
            self.config.distance,
            viewport.resolution,
            |category| self.config.is_category_visible(category),
        );
        let group_count = groups.len();
        let synthesizer = Synthesizer::from(&self.config);
        let entities: Vec<OutputEntity> = groups
            .into_iter()
            .flat_map(|group| synthesizer.synthesize(group, &self.extractor))
            .collect();

        self.generation += 1;
        debug!(
            "cluster pass {}: {} features, {} groups, {} entities",
            self.generation,
            features.len(),
            group_count,
            entities.len()
        );
        self.published = Arc::new(entities);
        self.invalidated = false;
        self.state = RecomputeState::Published;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use crate::source::{centroid_geometry, RTreeSource};
    use crate::types::{EntityKind, Feature};
    use geo::{polygon, Geometry, Point};

    fn region(size: f64) -> Rect<f64> {
        Rect::new((-size, -size), (size, size))
    }

    fn layer() -> ClusterLayer<RTreeSource> {
        let source = RTreeSource::from_features([
            Feature::point(0.0, 0.0, "A"),
            Feature::point(5.0, 0.0, "A"),
        ]);
        let mut layer = ClusterLayer::new(source);
        layer.set_category_visible("A", true);
        layer
    }

    #[test]
    fn nothing_happens_before_a_region_is_known() {
        let mut layer = layer();
        assert!(!layer.refresh());
        assert_eq!(layer.state(), RecomputeState::Idle);
        assert!(layer.entities().is_empty());
    }

    #[test]
    fn same_region_is_a_no_op() {
        let mut layer = layer();
        assert!(layer.load_region(region(100.0), 1.0).unwrap());
        let first = layer.entities().clone();
        assert_eq!(layer.state(), RecomputeState::Published);

        assert!(!layer.load_region(region(100.0), 2.0).unwrap());
        assert_eq!(layer.generation(), 1);
        assert!(Arc::ptr_eq(&first, layer.entities()));
        assert_eq!(layer.viewport().unwrap().resolution, 1.0);

        assert!(layer.load_region(region(50.0), 2.0).unwrap());
        assert_eq!(layer.generation(), 2);
    }

    #[test]
    fn config_change_invalidates() {
        let mut layer = layer();
        layer.load_region(region(100.0), 1.0).unwrap();
        assert!(!layer.is_stale());

        layer.set_cluster_title_visible(true);
        assert!(!layer.is_stale());
        layer.set_cluster_title_visible(false);
        assert!(layer.is_stale());
        assert!(layer.load_region(region(100.0), 1.0).unwrap());
        assert_eq!(layer.entities().len(), 1);

        layer.set_distance(1.0).unwrap();
        assert!(layer.refresh());
        assert_eq!(layer.entities().len(), 2);
        assert!(layer.entities().iter().all(|e| e.kind.tag() == "single"));
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut layer = layer();
        assert!(matches!(
            layer.set_distance(-5.0),
            Err(ClusterError::InvalidDistance(_))
        ));
        assert_eq!(layer.distance(), 20.0);
        assert!(matches!(
            layer.load_region(region(1.0), 0.0),
            Err(ClusterError::InvalidResolution(_))
        ));
        assert!(layer.viewport().is_none());
    }

    #[test]
    fn source_mutation_triggers_recompute() {
        let mut layer = layer();
        layer.load_region(region(100.0), 1.0).unwrap();
        layer.source_mut().insert(Feature::point(50.0, 50.0, "A"));
        assert!(layer.is_stale());
        assert!(layer.load_region(region(100.0), 1.0).unwrap());
        assert_eq!(layer.entities().len(), 3);
        assert!(!layer.is_stale());
    }

    #[test]
    fn temp_batch_is_single_slot() {
        let mut layer = layer();
        layer.load_region(region(100.0), 1.0).unwrap();
        assert!(layer
            .add_temp_entities(vec![TempEntity::new(Point::new(1.0, 1.0))])
            .is_none());
        let replaced = layer.add_temp_entities(vec![
            TempEntity::new(Point::new(2.0, 2.0)),
            TempEntity::new(Point::new(3.0, 3.0)),
        ]);
        assert_eq!(replaced.map(|batch| batch.len()), Some(1));
        assert_eq!(layer.temp_entities().len(), 2);

        layer.refresh();
        assert!(layer.temp_entities().is_empty());
    }

    #[test]
    fn per_category_extractor_reaches_the_published_set() {
        let zone = Feature::new(
            Some(Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 2.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 0.0, y: 2.0),
            ])),
            Some("zone".to_string()),
            None,
        );
        let features = vec![zone, Feature::point(3.0, 1.0, "zone")];

        let mut plain = ClusterLayer::new(RTreeSource::from_features(features.clone()));
        plain.set_category_visible("zone", true);
        plain.load_region(region(100.0), 1.0).unwrap();
        assert_eq!(plain.entities().len(), 1);
        assert_eq!(plain.entities()[0].kind.tag(), "single");
        assert_eq!(plain.entities()[0].position, Point::new(3.0, 1.0));

        let mut layer = ClusterLayer::new(RTreeSource::from_features(features))
            .with_extractor(GeometryExtractor::default().with_category("zone", centroid_geometry));
        layer.set_category_visible("zone", true);
        layer.load_region(region(100.0), 1.0).unwrap();
        let cluster = &layer.entities()[0];
        assert!(matches!(cluster.kind, EntityKind::Cluster { count: 2, .. }));
        assert!((cluster.position.x() - 2.0).abs() < 1e-9);
        assert!((cluster.position.y() - 1.0).abs() < 1e-9);
    }

    /// Hands out its features only once a region has been requested.
    struct LazySource {
        inner: RTreeSource,
        pending: Vec<Feature>,
        requests: Vec<(Rect<f64>, f64)>,
    }

    impl SpatialSource for LazySource {
        fn query_region(&self, region: &Rect<f64>) -> Vec<Arc<Feature>> {
            self.inner.query_region(region)
        }

        fn load_region(&mut self, region: &Rect<f64>, resolution: f64) {
            self.requests.push((*region, resolution));
            for feature in self.pending.drain(..) {
                self.inner.insert(feature);
            }
        }

        fn subscribe(&mut self) -> Receiver<SourceChange> {
            self.inner.subscribe()
        }
    }

    #[test]
    fn region_requests_reach_the_source() {
        let source = LazySource {
            inner: RTreeSource::new(),
            pending: vec![Feature::point(0.0, 0.0, "A"), Feature::point(5.0, 0.0, "A")],
            requests: Vec::new(),
        };
        let mut layer = ClusterLayer::new(source);
        layer.set_category_visible("A", true);

        assert!(layer.load_region(region(100.0), 2.0).unwrap());
        assert_eq!(layer.entities()[0].count(), Some(2));
        assert!(!layer.is_stale());

        assert!(!layer.load_region(region(100.0), 2.0).unwrap());
        assert_eq!(
            layer.source().requests,
            vec![(region(100.0), 2.0), (region(100.0), 2.0)]
        );

        assert!(layer.load_region(region(100.0), 0.0).is_err());
        assert_eq!(layer.source().requests.len(), 2);
    }
}
