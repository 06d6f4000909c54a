use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster distance must be a finite, non-negative pixel count, got {0}")]
    InvalidDistance(f64),
    #[error("resolution must be finite and positive, got {0}")]
    InvalidResolution(f64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid geojson: {0}")]
    GeoJson(#[from] Box<geojson::Error>),
}

impl From<geojson::Error> for ClusterError {
    fn from(err: geojson::Error) -> Self {
        ClusterError::GeoJson(Box::new(err))
    }
}

pub type Result<T, E = ClusterError> = std::result::Result<T, E>;
