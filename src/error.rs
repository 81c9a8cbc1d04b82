use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a source file or API payload into records.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document is not a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    #[error("feature {index} has no geometry")]
    MissingGeometry { index: usize },

    #[error("feature {index} has unsupported geometry type {kind:?}, expected Point")]
    UnsupportedGeometry { index: usize, kind: String },

    #[error("feature {index} has invalid coordinates")]
    InvalidCoordinates { index: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("maximum match distance must be a positive number of meters, got {0}")]
    InvalidThreshold(f64),
}
