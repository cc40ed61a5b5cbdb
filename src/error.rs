//! Error type shared by every stage of the pipeline.

use std::path::PathBuf;

/// Errors raised while loading, joining, placing labels or rendering.
///
/// Every error is fatal for the run; nothing is retried and no partial
/// image is written.
#[derive(Debug, thiserror::Error)]
pub enum ChoroplethError {
    #[error("failed to load boundary file {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("unsupported boundary format {extension:?} (expected shp, geojson or json)")]
    UnsupportedFormat { extension: String },

    #[error("filter matched zero of {total} records")]
    Filter { total: usize },

    #[error("column '{0}' not found in boundary attributes")]
    UnknownColumn(String),

    #[error("record {row} has no usable identifier in column '{column}'")]
    MissingIdentifier { row: usize, column: String },

    #[error("identifier '{0}' appears more than once")]
    DuplicateIdentifier(String),

    #[error("expected {expected} values (one per region), got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("value at position {index} is not finite")]
    NonFiniteValue { index: usize },

    #[error("row {row}: '{raw}' is not a number")]
    InvalidValue { row: usize, raw: String },

    #[error("no value found for region '{0}'")]
    UnmatchedRegion(String),

    #[error("invalid color domain [{min}, {max}]")]
    InvalidDomain { min: f64, max: f64 },

    #[error("unknown palette '{0}'")]
    UnknownPalette(String),

    #[error("invalid range [{min}, {max}) for synthetic values")]
    InvalidRange { min: f64, max: f64 },

    #[error("region '{0}' has empty geometry")]
    EmptyGeometry(String),

    #[error("region '{0}' has no value to render")]
    MissingValue(String),

    #[error("failed to load font {path:?}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("render failed: {0}")]
    Render(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChoroplethError>;
