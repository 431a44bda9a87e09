use thiserror::Error;

/// Errors from the blob storage layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The requested object does not exist in the backend.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Transient backend failure (network, permission, throttling).
    ///
    /// Callers retry idempotent reads a bounded number of times; this is
    /// never folded into `NotFound`.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// A persisted record exists but cannot be decoded.
    #[error("corrupt record at {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Errors from pyramid level-of-detail math.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Source raster has a zero dimension.
    #[error("invalid source dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Requested zoom level exceeds the pyramid's maximum.
    #[error("zoom level {level} out of range (max {max_level})")]
    ZoomOutOfRange { level: u32, max_level: u32 },
}

/// Errors from the label subsystem.
#[derive(Debug, Clone, Error)]
pub enum LabelError {
    /// The backing label store could not be reached.
    #[error("label backend unavailable: {0}")]
    Unavailable(String),

    /// No label backend was configured at startup.
    ///
    /// Label endpoints report service-unavailable; tile serving is not
    /// affected.
    #[error("label store is not configured")]
    Unconfigured,
}

/// Errors surfaced by the request-facing tile service.
#[derive(Debug, Clone, Error)]
pub enum ServeError {
    /// No pyramid metadata exists for the requested image set.
    #[error("unknown image set: {image_set}")]
    UnknownImageSet { image_set: String },

    /// Coordinates fall outside the valid grid for the image set.
    ///
    /// Kept distinct from `TileNotFound` internally; both map to 404 at
    /// the wire so pyramid internals are not leaked.
    #[error("tile ({x}, {y}) at level {level} is outside the grid for '{image_set}'")]
    CoordinateOutOfRange {
        image_set: String,
        level: u32,
        x: u32,
        y: u32,
    },

    /// Coordinates are in-grid but the backing artifact is absent
    /// (e.g. a partial generation run).
    #[error("tile not found: {path}")]
    TileNotFound { path: String },

    /// Storage-layer failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Label-subsystem failure.
    #[error("label error: {0}")]
    Labels(#[from] LabelError),
}

/// Errors from offline tile generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Malformed source raster; fatal to this generation run.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A tile could not be encoded.
    #[error("failed to encode tile {path}: {message}")]
    Encode { path: String, message: String },

    /// Storage-layer failure while persisting tiles or metadata.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The run was cancelled between zoom levels.
    #[error("generation cancelled before level {level}")]
    Cancelled { level: u32 },
}
