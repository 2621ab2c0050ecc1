//! Band and pixel-window types.

use serde::{Deserialize, Serialize};

/// Sample data type of a raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Byte,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    /// Parse from the conventional type name (case-insensitive).
    ///
    /// Unknown names fall back to `Byte`.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "uint16" => Self::UInt16,
            "int16" => Self::Int16,
            "uint32" => Self::UInt32,
            "int32" => Self::Int32,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            _ => Self::Byte,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Byte => write!(f, "Byte"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::Int16 => write!(f, "Int16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::Int32 => write!(f, "Int32"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
        }
    }
}

/// Metadata for a single raster band.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BandInfo {
    /// Sample data type.
    pub data_type: DataType,
    /// Optional no-data marker value.
    pub no_data: Option<f64>,
}

impl BandInfo {
    /// Create band info with no no-data value.
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            no_data: None,
        }
    }
}

/// An integer pixel rectangle: offset plus size within a raster grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub x_off: i64,
    pub y_off: i64,
    pub x_size: usize,
    pub y_size: usize,
}

impl PixelWindow {
    /// Create a new pixel window.
    pub fn new(x_off: i64, y_off: i64, x_size: usize, y_size: usize) -> Self {
        Self {
            x_off,
            y_off,
            x_size,
            y_size,
        }
    }

    /// Window covering a full raster of the given dimensions.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Check if the window has zero area.
    pub fn is_empty(&self) -> bool {
        self.x_size == 0 || self.y_size == 0
    }

    /// Exclusive right edge.
    pub fn x_end(&self) -> i64 {
        self.x_off + self.x_size as i64
    }

    /// Exclusive bottom edge.
    pub fn y_end(&self) -> i64 {
        self.y_off + self.y_size as i64
    }

    /// Compute the overlapping window, if any.
    pub fn intersect(&self, other: &PixelWindow) -> Option<PixelWindow> {
        let x0 = self.x_off.max(other.x_off);
        let y0 = self.y_off.max(other.y_off);
        let x1 = self.x_end().min(other.x_end());
        let y1 = self.y_end().min(other.y_end());

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(PixelWindow::new(
            x0,
            y0,
            (x1 - x0) as usize,
            (y1 - y0) as usize,
        ))
    }

    /// Check that the window lies fully within a raster of the given size.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.x_off >= 0
            && self.y_off >= 0
            && self.x_end() <= width as i64
            && self.y_end() <= height as i64
    }
}

impl std::fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x_off, self.y_off, self.x_size, self.y_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_from_name() {
        assert_eq!(DataType::from_name("Byte"), DataType::Byte);
        assert_eq!(DataType::from_name("FLOAT32"), DataType::Float32);
        assert_eq!(DataType::from_name("int16"), DataType::Int16);
        assert_eq!(DataType::from_name("unknown"), DataType::Byte);
    }

    #[test]
    fn test_data_type_display_roundtrip() {
        for dt in [
            DataType::Byte,
            DataType::UInt16,
            DataType::Int16,
            DataType::UInt32,
            DataType::Int32,
            DataType::Float32,
            DataType::Float64,
        ] {
            assert_eq!(DataType::from_name(&dt.to_string()), dt);
        }
    }

    #[test]
    fn test_window_intersect() {
        let a = PixelWindow::new(0, 0, 10, 10);
        let b = PixelWindow::new(5, 5, 10, 10);
        let c = PixelWindow::new(20, 20, 5, 5);

        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap, PixelWindow::new(5, 5, 5, 5));
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_window_fits_within() {
        let w = PixelWindow::new(0, 1, 19, 19);
        assert!(w.fits_within(20, 20));
        assert!(!w.fits_within(19, 19));
        assert!(!PixelWindow::new(-1, 0, 5, 5).fits_within(20, 20));
    }
}
