//! Affine geotransform mapping pixel/line indices to georeferenced coordinates.

use crate::bbox::BoundingBox;
use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing a raster.
///
/// Converts between pixel coordinates (col, row) and georeferenced
/// coordinates (x, y):
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For north-up rasters `row_rotation` and `col_rotation` are 0 and
/// `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner.
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner.
    pub origin_y: f64,
    /// Pixel width (cell size in X direction).
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative).
    pub pixel_height: f64,
    /// Row rotation term (usually 0).
    pub row_rotation: f64,
    /// Column rotation term (usually 0).
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a north-up geotransform with no rotation.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Create from the conventional 6-coefficient array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_coeffs(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Convert to the conventional 6-coefficient array.
    pub fn coeffs(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Convert fractional pixel coordinates (top-left corner of the pixel)
    /// to georeferenced coordinates.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert georeferenced coordinates to fractional pixel coordinates.
    ///
    /// Returns `None` for a degenerate (non-invertible) transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-10 {
            return None;
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        Some((col, row))
    }

    /// Check that the grid is axis aligned (no rotation or shear terms).
    pub fn is_axis_aligned(&self) -> bool {
        self.row_rotation.abs() < 1e-10 && self.col_rotation.abs() < 1e-10
    }

    /// Absolute pixel size in the X direction.
    pub fn x_res(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Absolute pixel size in the Y direction.
    pub fn y_res(&self) -> f64 {
        self.pixel_height.abs()
    }

    /// Georeferenced extent of a raster of the given pixel dimensions.
    pub fn extent(&self, width: usize, height: usize) -> BoundingBox {
        let (x0, y0) = self.pixel_to_geo(0.0, 0.0);
        let (x1, y1) = self.pixel_to_geo(width as f64, 0.0);
        let (x2, y2) = self.pixel_to_geo(0.0, height as f64);
        let (x3, y3) = self.pixel_to_geo(width as f64, height as f64);

        BoundingBox {
            min_x: x0.min(x1).min(x2).min(x3),
            min_y: y0.min(y1).min(y2).min(y3),
            max_x: x0.max(x1).max(x2).max(x3),
            max_y: y0.max(y1).max(y2).max(y3),
        }
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
