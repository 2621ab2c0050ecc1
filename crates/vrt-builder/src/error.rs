//! Error types for mosaic building.

use raster_core::RasterError;
use thiserror::Error;

/// Errors that can occur while building or reopening a virtual mosaic.
#[derive(Error, Debug)]
pub enum VrtBuildError {
    /// A source could not be resolved to a readable raster.
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Sources disagree on band count or type and `separate` was not requested.
    #[error("incompatible source grids: {0}")]
    IncompatibleGrid(String),

    /// No source intersects the requested output bounds.
    #[error("no source intersects the requested output bounds")]
    EmptyOverlap,

    /// The progress callback requested a stop.
    #[error("build cancelled by progress callback")]
    Cancelled,

    /// The build options are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The description could not be serialized to its destination.
    #[error("failed to serialize description: {0}")]
    Serialize(String),

    /// A persisted description could not be parsed.
    #[error("failed to parse description: {0}")]
    Parse(String),

    /// An underlying raster operation failed.
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Filesystem error on the destination.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VrtBuildError {
    /// Create an InvalidSource error.
    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    /// Create an IncompatibleGrid error.
    pub fn incompatible_grid(msg: impl Into<String>) -> Self {
        Self::IncompatibleGrid(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a Parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Result type for mosaic building operations.
pub type Result<T> = std::result::Result<T, VrtBuildError>;
