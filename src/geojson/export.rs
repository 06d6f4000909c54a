use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use super::{CATEGORY_PROPERTY, DATA_PROPERTY};
use crate::source::SpatialSource;
use crate::types::{EntityKind, OutputEntity, TempEntity};
use crate::ClusterLayer;

/// Property carrying the entity kind (`cluster`, `single`, ...).
pub const KIND_PROPERTY: &str = "featureType";

/// Converts one synthesized entity into a renderable GeoJSON point.
pub fn entity_to_feature(entity: &OutputEntity) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(KIND_PROPERTY.to_string(), entity.kind.tag().into());
    properties.insert(CATEGORY_PROPERTY.to_string(), entity.category.clone().into());
    match &entity.kind {
        EntityKind::Cluster { count, members } => {
            properties.insert("count".to_string(), (*count).into());
            let ids: Vec<JsonValue> = members
                .iter()
                .map(|member| member.id.to_string().into())
                .collect();
            properties.insert("features".to_string(), ids.into());
        }
        EntityKind::ClusterTitle { count } => {
            properties.insert("count".to_string(), (*count).into());
        }
        EntityKind::Single { data } => {
            properties.insert(
                DATA_PROPERTY.to_string(),
                serde_json::to_value(data).unwrap_or_default(),
            );
        }
        EntityKind::SingleTitle { name } => {
            properties.insert("name".to_string(), name.clone().into());
        }
        EntityKind::Shadow { rotation } => {
            properties.insert("rotation".to_string(), (*rotation).into());
        }
    }
    point_feature(entity.position, properties)
}

pub fn temp_to_feature(entity: &TempEntity) -> Feature {
    point_feature(entity.position, entity.properties.clone())
}

/// Everything the layer currently shows: published entities followed by the temporary batch.
pub fn layer_to_feature_collection<S: SpatialSource>(layer: &ClusterLayer<S>) -> FeatureCollection {
    let features = layer
        .entities()
        .iter()
        .map(entity_to_feature)
        .chain(layer.temp_entities().iter().map(temp_to_feature))
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn point_feature(position: geo::Point<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&position))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
