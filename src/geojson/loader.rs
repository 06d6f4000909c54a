use std::{fs::File, io::BufReader, path::Path};

use bevy::log::debug;
use geojson::GeoJson;
use serde_json::Value;

use crate::error::Result;
use crate::types::{Feature, Payload};

/// Property holding the grouping category.
pub const CATEGORY_PROPERTY: &str = "type";
/// Property holding the marker model.
pub const DATA_PROPERTY: &str = "data";

/// Reads features from a GeoJSON file. Anything other than a `FeatureCollection`,
/// a single `Feature`, or a bare geometry yields no features.
pub fn load_features(path: impl AsRef<Path>) -> Result<Vec<Feature>> {
    let reader = BufReader::new(File::open(path)?);
    let geojson = GeoJson::from_reader(reader)?;
    Ok(features_from_geojson(geojson))
}

pub fn features_from_str(data: &str) -> Result<Vec<Feature>> {
    let geojson: GeoJson = data.parse()?;
    Ok(features_from_geojson(geojson))
}

pub fn features_from_geojson(geojson: GeoJson) -> Vec<Feature> {
    match geojson {
        GeoJson::FeatureCollection(collection) => {
            collection.features.into_iter().map(convert_feature).collect()
        }
        GeoJson::Feature(feature) => vec![convert_feature(feature)],
        GeoJson::Geometry(geometry) => vec![Feature::new(convert_geometry(geometry), None, None)],
    }
}

fn convert_feature(feature: geojson::Feature) -> Feature {
    let geometry = feature.geometry.and_then(convert_geometry);
    let properties = feature.properties.unwrap_or_default();
    let category = properties.get(CATEGORY_PROPERTY).and_then(category_label);
    let data = properties.get(DATA_PROPERTY).and_then(|value| {
        match serde_json::from_value::<Payload>(value.clone()) {
            Ok(payload) => Some(payload),
            Err(err) => {
                debug!("ignoring unreadable marker data: {}", err);
                None
            }
        }
    });
    Feature::new(geometry, category, data)
}

fn convert_geometry(geometry: geojson::Geometry) -> Option<geo::Geometry<f64>> {
    match geo::Geometry::<f64>::try_from(geometry) {
        Ok(geometry) => Some(geometry),
        Err(err) => {
            debug!("ignoring unsupported geometry: {}", err);
            None
        }
    }
}

/// Scalars are stringified so numeric codes still group; anything else has no category.
fn category_label(value: &Value) -> Option<String> {
    match value {
        Value::String(label) => Some(label.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
