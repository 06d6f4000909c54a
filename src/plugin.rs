use bevy::prelude::*;
use geo::Rect;

use crate::settings::ClusterConfig;
use crate::source::RTreeSource;
use crate::ClusterLayer;

/// Hooks a cluster layer into a Bevy app. Insert a [`ClusterLayerResource`] before
/// adding the plugin to bring your own features, otherwise an empty one is created.
#[derive(Default)]
pub struct ClusterPlugin {
    pub config: ClusterConfig,
}

impl Plugin for ClusterPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<ClusterLayerResource>() {
            let mut layer = ClusterLayer::new(RTreeSource::new());
            if let Err(err) = layer.set_config(self.config.clone()) {
                warn!("Ignoring cluster config: {}", err);
            }
            app.insert_resource(ClusterLayerResource(layer));
        }
        app.add_event::<ViewportChangedEvent>()
            .add_event::<SourceChangedEvent>()
            .add_event::<ClusterPublishedEvent>()
            .add_systems(
                Update,
                (apply_viewport_changes, refresh_stale_layer).chain(),
            );
    }
}

#[derive(Resource, Deref, DerefMut)]
pub struct ClusterLayerResource(pub ClusterLayer<RTreeSource>);

/// Sent by the map whenever the visible region or zoom changes.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct ViewportChangedEvent {
    pub region: Rect<f64>,
    pub resolution: f64,
}

/// Sent when features changed somewhere the layer cannot see.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct SourceChangedEvent;

/// A new set of entities is available on the [`ClusterLayerResource`].
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterPublishedEvent {
    pub generation: u64,
    pub entities: usize,
}

fn apply_viewport_changes(
    mut viewport_changed: EventReader<ViewportChangedEvent>,
    mut layer: ResMut<ClusterLayerResource>,
    mut published: EventWriter<ClusterPublishedEvent>,
) {
    // Only the most recent viewport of the frame matters.
    let Some(viewport) = viewport_changed.read().last().copied() else {
        return;
    };
    match layer.load_region(viewport.region, viewport.resolution) {
        Ok(true) => {
            published.send(ClusterPublishedEvent {
                generation: layer.generation(),
                entities: layer.entities().len(),
            });
        }
        Ok(false) => {}
        Err(err) => warn!("Skipping cluster pass: {}", err),
    }
}

fn refresh_stale_layer(
    mut source_changed: EventReader<SourceChangedEvent>,
    mut layer: ResMut<ClusterLayerResource>,
    mut published: EventWriter<ClusterPublishedEvent>,
) {
    if !source_changed.is_empty() {
        source_changed.clear();
        layer.notify_source_changed();
    }
    if layer.is_stale() && layer.refresh() {
        published.send(ClusterPublishedEvent {
            generation: layer.generation(),
            entities: layer.entities().len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Feature;

    fn app_with(features: Vec<Feature>) -> App {
        let mut layer = ClusterLayer::new(RTreeSource::from_features(features));
        layer.set_category_visible("A", true);
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(ClusterLayerResource(layer))
            .add_plugins(ClusterPlugin::default());
        app
    }

    fn published(app: &App) -> Vec<ClusterPublishedEvent> {
        let events = app.world().resource::<Events<ClusterPublishedEvent>>();
        events.get_cursor().read(events).copied().collect()
    }

    fn viewport(size: f64) -> ViewportChangedEvent {
        ViewportChangedEvent {
            region: geo::Rect::new((-size, -size), (size, size)),
            resolution: 1.0,
        }
    }

    #[test]
    fn viewport_event_publishes_once() {
        let mut app = app_with(vec![
            Feature::point(0.0, 0.0, "A"),
            Feature::point(5.0, 0.0, "A"),
        ]);
        app.world_mut().send_event(viewport(100.0));
        app.update();
        assert_eq!(
            published(&app),
            vec![ClusterPublishedEvent {
                generation: 1,
                entities: 2
            }]
        );

        app.world_mut().send_event(viewport(100.0));
        app.update();
        assert_eq!(app.world().resource::<ClusterLayerResource>().generation(), 1);
    }

    #[test]
    fn source_edits_are_picked_up() {
        let mut app = app_with(vec![Feature::point(0.0, 0.0, "A")]);
        app.world_mut().send_event(viewport(100.0));
        app.update();

        app.world_mut()
            .resource_mut::<ClusterLayerResource>()
            .source_mut()
            .insert(Feature::point(90.0, 90.0, "A"));
        app.update();
        let layer = app.world().resource::<ClusterLayerResource>();
        assert_eq!(layer.generation(), 2);
        assert_eq!(layer.entities().len(), 2);

        app.world_mut().send_event(SourceChangedEvent);
        app.update();
        assert_eq!(app.world().resource::<ClusterLayerResource>().generation(), 3);
    }

    #[test]
    fn invalid_resolution_is_skipped() {
        let mut app = app_with(vec![Feature::point(0.0, 0.0, "A")]);
        app.world_mut().send_event(ViewportChangedEvent {
            resolution: -1.0,
            ..viewport(10.0)
        });
        app.update();
        let layer = app.world().resource::<ClusterLayerResource>();
        assert_eq!(layer.generation(), 0);
        assert!(layer.viewport().is_none());
    }
}
