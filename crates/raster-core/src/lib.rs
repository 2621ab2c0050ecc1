//! Common raster types shared by the virtual mosaic builder and its tools.

pub mod bbox;
pub mod checksum;
pub mod error;
pub mod geotransform;
pub mod opener;
pub mod source;
pub mod types;

pub use bbox::BoundingBox;
pub use checksum::{band_checksum, checksum_of};
pub use error::{RasterError, RasterResult};
pub use geotransform::GeoTransform;
pub use opener::RasterOpener;
pub use source::{MemRaster, RasterSource};
pub use types::{BandInfo, DataType, PixelWindow};
