//! Error types for core raster operations.

use thiserror::Error;

/// Errors that can occur while reading or probing a raster.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The requested band index does not exist.
    #[error("band {band} out of range (raster has {count} bands)")]
    InvalidBand { band: usize, count: usize },

    /// The requested pixel window falls outside the raster.
    #[error("window {window} exceeds raster bounds {width}x{height}")]
    WindowOutOfBounds {
        window: String,
        width: usize,
        height: usize,
    },

    /// The geotransform cannot be inverted (zero pixel size).
    #[error("geotransform is degenerate and cannot be inverted")]
    DegenerateGeoTransform,

    /// A raster could not be opened by name.
    #[error("failed to open raster: {0}")]
    OpenFailed(String),
}

impl RasterError {
    /// Create an InvalidBand error.
    pub fn invalid_band(band: usize, count: usize) -> Self {
        Self::InvalidBand { band, count }
    }

    /// Create a WindowOutOfBounds error.
    pub fn window_out_of_bounds(
        window: impl std::fmt::Display,
        width: usize,
        height: usize,
    ) -> Self {
        Self::WindowOutOfBounds {
            window: window.to_string(),
            width,
            height,
        }
    }

    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }
}

/// Result type for core raster operations.
pub type RasterResult<T> = std::result::Result<T, RasterError>;
