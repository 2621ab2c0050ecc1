//! The seam to the generic raster-opening subsystem.

use std::sync::Arc;

use crate::error::RasterResult;
use crate::source::RasterSource;

/// Opens rasters by name.
///
/// This is the boundary to whatever raster I/O subsystem is in use; the
/// mosaic builder re-resolves path-referenced sources through it lazily at
/// read time and never keeps them open.
pub trait RasterOpener: Send + Sync {
    /// Open the raster registered or stored under `name`.
    fn open(&self, name: &str) -> RasterResult<Arc<dyn RasterSource>>;
}
