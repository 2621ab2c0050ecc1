//! Per-source geometry mapping: source and destination pixel windows.

use raster_core::{BoundingBox, GeoTransform, PixelWindow};

use crate::extent::OutputGrid;
use crate::resolver::SourceDescriptor;

/// Numeric tolerance when snapping fractional pixel coordinates, as a
/// fraction of a pixel.
const PIXEL_EPS: f64 = 1e-3;

/// The pixel rectangles a source contributes to the mosaic.
///
/// Both rectangles describe the same georeferenced region; their pixel
/// counts differ when the source and output resolutions differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMapping {
    /// Sub-window of the source, in source pixel space.
    pub src_rect: PixelWindow,
    /// Landing window in the output, in output pixel space.
    pub dst_rect: PixelWindow,
}

/// Compute the windows a source contributes to the output grid.
///
/// Returns `None` when the source lies outside the output extent or the
/// overlap degenerates to zero width or height after snapping.
pub fn map_source(source: &SourceDescriptor, grid: &OutputGrid) -> Option<SourceMapping> {
    let overlap = source.extent().intersection(&grid.extent())?;

    let src_rect = snap_to_window(&source.geotransform, &overlap, source.width, source.height)?;
    let dst_rect = snap_to_window(&grid.geotransform, &overlap, grid.width, grid.height)?;

    Some(SourceMapping { src_rect, dst_rect })
}

/// Convert a georeferenced region to an integer pixel window of a grid.
///
/// Lower bounds round down and upper bounds round up, each after an epsilon
/// nudge, so the window never shrinks below the true overlap; the result is
/// then clamped to the grid.
fn snap_to_window(
    gt: &GeoTransform,
    region: &BoundingBox,
    width: usize,
    height: usize,
) -> Option<PixelWindow> {
    // Upper-left and lower-right corners in fractional pixel space. For a
    // north-up grid (negative pixel height) max_y maps to the smaller row.
    let (x0, y0) = gt.geo_to_pixel(region.min_x, region.max_y)?;
    let (x1, y1) = gt.geo_to_pixel(region.max_x, region.min_y)?;

    let (x0, x1) = (x0.min(x1), x0.max(x1));
    let (y0, y1) = (y0.min(y1), y0.max(y1));

    let left = ((x0 + PIXEL_EPS).floor() as i64).max(0);
    let top = ((y0 + PIXEL_EPS).floor() as i64).max(0);
    let right = ((x1 - PIXEL_EPS).ceil() as i64).min(width as i64);
    let bottom = ((y1 - PIXEL_EPS).ceil() as i64).min(height as i64);

    if right <= left || bottom <= top {
        return None;
    }

    Some(PixelWindow::new(
        left,
        top,
        (right - left) as usize,
        (bottom - top) as usize,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SourceRef;
    use raster_core::{BandInfo, DataType, MemRaster, RasterSource};
    use std::sync::Arc;

    fn descriptor(gt: GeoTransform, width: usize, height: usize) -> SourceDescriptor {
        let raster: Arc<dyn RasterSource> =
            Arc::new(MemRaster::new(width, height, gt, 1, DataType::Byte));
        SourceDescriptor {
            reference: SourceRef::Live(raster),
            geotransform: gt,
            width,
            height,
            bands: vec![BandInfo::new(DataType::Byte)],
        }
    }

    #[test]
    fn test_identity_mapping() {
        let gt = GeoTransform::new(440720.0, 3751320.0, 60.0, -60.0);
        let source = descriptor(gt, 20, 20);
        let grid = OutputGrid {
            geotransform: gt,
            width: 20,
            height: 20,
        };

        let mapping = map_source(&source, &grid).unwrap();
        assert_eq!(mapping.src_rect, PixelWindow::full(20, 20));
        assert_eq!(mapping.dst_rect, PixelWindow::full(20, 20));
    }

    #[test]
    fn test_partial_overlap_with_coarser_output() {
        // Source: 20x20 at 60-unit pixels; output: explicit bounds at
        // 30x60-unit pixels, partially outside the source extent.
        let source = descriptor(GeoTransform::new(440720.0, 3751320.0, 60.0, -60.0), 20, 20);
        let grid = OutputGrid {
            geotransform: GeoTransform::new(440600.0, 3751260.0, 30.0, -60.0),
            width: 42,
            height: 20,
        };

        let mapping = map_source(&source, &grid).unwrap();
        assert_eq!(mapping.src_rect, PixelWindow::new(0, 1, 19, 19));
        assert_eq!(mapping.dst_rect, PixelWindow::new(4, 0, 38, 19));
    }

    #[test]
    fn test_disjoint_source_dropped() {
        let source = descriptor(GeoTransform::new(0.0, 10.0, 1.0, -1.0), 10, 10);
        let grid = OutputGrid {
            geotransform: GeoTransform::new(100.0, 10.0, 1.0, -1.0),
            width: 10,
            height: 10,
        };

        assert!(map_source(&source, &grid).is_none());
    }

    #[test]
    fn test_edge_touching_source_dropped() {
        let source = descriptor(GeoTransform::new(0.0, 10.0, 1.0, -1.0), 10, 10);
        let grid = OutputGrid {
            geotransform: GeoTransform::new(10.0, 10.0, 1.0, -1.0),
            width: 10,
            height: 10,
        };

        assert!(map_source(&source, &grid).is_none());
    }

    #[test]
    fn test_sub_pixel_sliver_survives_epsilon() {
        // Overlap of half a source pixel must still produce a 1-pixel window.
        let source = descriptor(GeoTransform::new(0.0, 10.0, 1.0, -1.0), 10, 10);
        let grid = OutputGrid {
            geotransform: GeoTransform::new(9.5, 10.0, 1.0, -1.0),
            width: 10,
            height: 10,
        };

        let mapping = map_source(&source, &grid).unwrap();
        assert_eq!(mapping.src_rect, PixelWindow::new(9, 0, 1, 10));
        assert_eq!(mapping.dst_rect, PixelWindow::new(0, 0, 1, 10));
    }
}
