//! The raster source contract and an in-memory implementation.

use crate::bbox::BoundingBox;
use crate::error::{RasterError, RasterResult};
use crate::geotransform::GeoTransform;
use crate::types::{BandInfo, DataType, PixelWindow};

/// A readable, georeferenced raster.
///
/// Band indices are 1-based throughout, matching the convention of the
/// persisted description format. Samples are normalized to `f64` on read;
/// the band's [`DataType`] records the nominal storage type.
///
/// A virtual mosaic dataset implements this trait as well, so a mosaic can
/// feed straight back into another mosaic build.
pub trait RasterSource: Send + Sync {
    /// Width in pixels.
    fn width(&self) -> usize;

    /// Height in pixels.
    fn height(&self) -> usize;

    /// Pixel-to-georeferenced mapping.
    fn geotransform(&self) -> GeoTransform;

    /// Number of bands.
    fn band_count(&self) -> usize;

    /// Metadata for a band (1-based index).
    fn band_info(&self, band: usize) -> RasterResult<BandInfo>;

    /// Read a pixel window from a band (1-based index), row-major.
    fn read_band(&self, band: usize, window: PixelWindow) -> RasterResult<Vec<f64>>;

    /// Name under which this raster may be reopened, if any.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Georeferenced extent of the full raster.
    fn extent(&self) -> BoundingBox {
        self.geotransform().extent(self.width(), self.height())
    }
}

/// A heap-backed raster, used for synthetic sources and overview levels.
#[derive(Debug, Clone)]
pub struct MemRaster {
    name: Option<String>,
    width: usize,
    height: usize,
    geotransform: GeoTransform,
    bands: Vec<MemBand>,
}

#[derive(Debug, Clone)]
struct MemBand {
    info: BandInfo,
    data: Vec<f64>,
}

impl MemRaster {
    /// Create a new zero-filled raster.
    pub fn new(
        width: usize,
        height: usize,
        geotransform: GeoTransform,
        band_count: usize,
        data_type: DataType,
    ) -> Self {
        let bands = (0..band_count)
            .map(|_| MemBand {
                info: BandInfo::new(data_type),
                data: vec![0.0; width * height],
            })
            .collect();

        Self {
            name: None,
            width,
            height,
            geotransform,
            bands,
        }
    }

    /// Create a new zero-filled raster with explicit per-band metadata.
    pub fn with_bands(
        width: usize,
        height: usize,
        geotransform: GeoTransform,
        bands: Vec<BandInfo>,
    ) -> Self {
        let bands = bands
            .into_iter()
            .map(|info| MemBand {
                info,
                data: vec![0.0; width * height],
            })
            .collect();

        Self {
            name: None,
            width,
            height,
            geotransform,
            bands,
        }
    }

    /// Attach a name to this raster.
    ///
    /// The name is advisory only; an in-memory raster is not reopenable
    /// through it unless some opener chooses to register it.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fill an entire band (1-based index) with a constant value.
    pub fn fill(&mut self, band: usize, value: f64) -> RasterResult<()> {
        let count = self.bands.len();
        let b = self
            .bands
            .get_mut(band.wrapping_sub(1))
            .ok_or_else(|| RasterError::invalid_band(band, count))?;
        b.data.fill(value);
        Ok(())
    }

    /// Replace the full contents of a band (1-based index).
    pub fn write_band(&mut self, band: usize, data: Vec<f64>) -> RasterResult<()> {
        let count = self.bands.len();
        let expected = self.width * self.height;
        if data.len() != expected {
            return Err(RasterError::window_out_of_bounds(
                format!("buffer of {} samples (expected {})", data.len(), expected),
                self.width,
                self.height,
            ));
        }
        let b = self
            .bands
            .get_mut(band.wrapping_sub(1))
            .ok_or_else(|| RasterError::invalid_band(band, count))?;
        b.data = data;
        Ok(())
    }

    /// Set a single pixel of a band (1-based index).
    pub fn set_pixel(&mut self, band: usize, col: usize, row: usize, value: f64) -> RasterResult<()> {
        let count = self.bands.len();
        if col >= self.width || row >= self.height {
            return Err(RasterError::window_out_of_bounds(
                format!("pixel ({col}, {row})"),
                self.width,
                self.height,
            ));
        }
        let width = self.width;
        let b = self
            .bands
            .get_mut(band.wrapping_sub(1))
            .ok_or_else(|| RasterError::invalid_band(band, count))?;
        b.data[row * width + col] = value;
        Ok(())
    }

    /// Set the no-data value for a band (1-based index).
    pub fn set_no_data(&mut self, band: usize, no_data: Option<f64>) -> RasterResult<()> {
        let count = self.bands.len();
        let b = self
            .bands
            .get_mut(band.wrapping_sub(1))
            .ok_or_else(|| RasterError::invalid_band(band, count))?;
        b.info.no_data = no_data;
        Ok(())
    }
}

impl RasterSource for MemRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn geotransform(&self) -> GeoTransform {
        self.geotransform
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn band_info(&self, band: usize) -> RasterResult<BandInfo> {
        self.bands
            .get(band.wrapping_sub(1))
            .map(|b| b.info)
            .ok_or_else(|| RasterError::invalid_band(band, self.bands.len()))
    }

    fn read_band(&self, band: usize, window: PixelWindow) -> RasterResult<Vec<f64>> {
        let b = self
            .bands
            .get(band.wrapping_sub(1))
            .ok_or_else(|| RasterError::invalid_band(band, self.bands.len()))?;

        if !window.fits_within(self.width, self.height) {
            return Err(RasterError::window_out_of_bounds(
                window,
                self.width,
                self.height,
            ));
        }

        let mut out = Vec::with_capacity(window.x_size * window.y_size);
        for row in 0..window.y_size {
            let start = (window.y_off as usize + row) * self.width + window.x_off as usize;
            out.extend_from_slice(&b.data[start..start + window.x_size]);
        }
        Ok(out)
    }

    fn description(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_raster() -> MemRaster {
        let mut r = MemRaster::new(
            4,
            3,
            GeoTransform::new(0.0, 3.0, 1.0, -1.0),
            1,
            DataType::Byte,
        );
        let data: Vec<f64> = (0..12).map(|v| v as f64).collect();
        r.write_band(1, data).unwrap();
        r
    }

    #[test]
    fn test_read_full() {
        let r = test_raster();
        let data = r.read_band(1, PixelWindow::full(4, 3)).unwrap();
        assert_eq!(data.len(), 12);
        assert_eq!(data[0], 0.0);
        assert_eq!(data[11], 11.0);
    }

    #[test]
    fn test_read_window() {
        let r = test_raster();
        let data = r.read_band(1, PixelWindow::new(1, 1, 2, 2)).unwrap();
        assert_eq!(data, vec![5.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let r = test_raster();
        assert!(matches!(
            r.read_band(1, PixelWindow::new(3, 0, 2, 1)),
            Err(RasterError::WindowOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_invalid_band() {
        let r = test_raster();
        assert!(matches!(
            r.read_band(2, PixelWindow::full(4, 3)),
            Err(RasterError::InvalidBand { band: 2, count: 1 })
        ));
        assert!(matches!(
            r.read_band(0, PixelWindow::full(4, 3)),
            Err(RasterError::InvalidBand { .. })
        ));
    }

    #[test]
    fn test_fill_and_extent() {
        let mut r = MemRaster::new(
            1,
            1,
            GeoTransform::new(2.0, 49.0, 1.0, -1.0),
            1,
            DataType::Byte,
        );
        r.fill(1, 100.0).unwrap();
        assert_eq!(r.read_band(1, PixelWindow::full(1, 1)).unwrap(), vec![100.0]);

        let extent = r.extent();
        assert_eq!(extent.min_x, 2.0);
        assert_eq!(extent.max_x, 3.0);
        assert_eq!(extent.min_y, 48.0);
        assert_eq!(extent.max_y, 49.0);
    }
}
