use std::{collections::BTreeSet, env, error::Error, process::ExitCode};

use bevy::{log::LogPlugin, prelude::*};
use map_cluster::{
    geojson::{layer_to_feature_collection, load_features},
    settings::validate_resolution,
    ClusterConfig, ClusterLayer, ClusterLayerResource, ClusterPlugin, RTreeSource,
    ViewportChangedEvent,
};

const USAGE: &str = "usage: map-cluster <features.geojson> [config.json] [resolution]";

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(features_path) = args.next() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };
    match run(&features_path, args.next(), args.next()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("map-cluster: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Clusters a GeoJSON file over its full extent and returns the result as GeoJSON.
fn run(
    features_path: &str,
    config_path: Option<String>,
    resolution: Option<String>,
) -> Result<String, Box<dyn Error>> {
    let resolution: f64 = match resolution {
        Some(resolution) => resolution.parse()?,
        None => 1.0,
    };
    validate_resolution(resolution)?;

    let features = load_features(features_path)?;
    let config = match config_path {
        Some(path) => ClusterConfig::load(path)?,
        // Without a config every category in the file is shown.
        None => {
            let categories: BTreeSet<String> = features
                .iter()
                .filter_map(|feature| feature.category.clone())
                .collect();
            ClusterConfig::default().with_categories(categories)
        }
    };

    let source = RTreeSource::from_features(features);
    let region = source.extent();
    let mut layer = ClusterLayer::new(source);
    layer.set_config(config)?;

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(ClusterLayerResource(layer))
        .add_plugins(ClusterPlugin::default());
    if let Some(region) = region {
        app.world_mut()
            .send_event(ViewportChangedEvent { region, resolution });
    }
    app.update();

    let layer = app.world().resource::<ClusterLayerResource>();
    info!("Published {} entities", layer.entities().len());
    Ok(serde_json::to_string(&layer_to_feature_collection(&layer.0))?)
}
