//! Configuration for a mosaic build.

use std::sync::Arc;

use raster_core::{BoundingBox, RasterOpener};
use serde::{Deserialize, Serialize};

use crate::dataset::VrtFileOpener;
use crate::error::{Result, VrtBuildError};

/// How the output resolution is derived from the sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Finest resolution among all sources.
    #[default]
    Highest,
    /// Coarsest resolution among all sources.
    Lowest,
    /// Arithmetic mean of the source resolutions.
    Average,
    /// Explicit caller-supplied resolution.
    User { x_res: f64, y_res: f64 },
}

/// Resampling method, propagated to read-time consumers and the overview
/// service; the builder itself does not interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    #[default]
    Nearest,
    Bilinear,
    Cubic,
    Average,
    Mode,
}

impl ResamplingMethod {
    /// Parse from string (case-insensitive). Unknown names fall back to
    /// nearest.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bilinear" => Self::Bilinear,
            "cubic" | "bicubic" => Self::Cubic,
            "average" | "mean" => Self::Average,
            "mode" => Self::Mode,
            _ => Self::Nearest,
        }
    }
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Cubic => write!(f, "cubic"),
            Self::Average => write!(f, "average"),
            Self::Mode => write!(f, "mode"),
        }
    }
}

/// What to do when no source intersects the requested output bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyOverlapPolicy {
    /// Succeed with a raster of the requested size containing no sources.
    #[default]
    AllowEmpty,
    /// Fail the build with `EmptyOverlap`.
    Fail,
}

/// Options recognized by the mosaic build entry point.
#[derive(Clone)]
pub struct BuildOptions {
    /// Explicit output bounds; defaults to the union of all source extents.
    pub output_bounds: Option<BoundingBox>,
    /// Output resolution policy.
    pub resolution: ResolutionPolicy,
    /// Snap output bounds outward to multiples of the resolution.
    pub target_aligned_pixels: bool,
    /// Place each source in its own output band instead of mosaicking.
    pub separate: bool,
    /// Append an alpha band tracking source coverage.
    pub add_alpha: bool,
    /// Resampling method, propagated but not interpreted by the builder.
    pub resampling: ResamplingMethod,
    /// Subset of source bands to expose (1-based); defaults to all.
    pub band_list: Option<Vec<usize>>,
    /// Policy when no source intersects the output bounds.
    pub empty_overlap: EmptyOverlapPolicy,
    /// Opener used to resolve path sources, at build and at read time.
    pub opener: Arc<dyn RasterOpener>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output_bounds: None,
            resolution: ResolutionPolicy::default(),
            target_aligned_pixels: false,
            separate: false,
            add_alpha: false,
            resampling: ResamplingMethod::default(),
            band_list: None,
            empty_overlap: EmptyOverlapPolicy::default(),
            opener: Arc::new(VrtFileOpener),
        }
    }
}

impl std::fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOptions")
            .field("output_bounds", &self.output_bounds)
            .field("resolution", &self.resolution)
            .field("target_aligned_pixels", &self.target_aligned_pixels)
            .field("separate", &self.separate)
            .field("add_alpha", &self.add_alpha)
            .field("resampling", &self.resampling)
            .field("band_list", &self.band_list)
            .field("empty_overlap", &self.empty_overlap)
            .finish_non_exhaustive()
    }
}

impl BuildOptions {
    /// Validate option consistency before a build.
    pub fn validate(&self) -> Result<()> {
        if let ResolutionPolicy::User { x_res, y_res } = self.resolution {
            if x_res <= 0.0 || y_res <= 0.0 {
                return Err(VrtBuildError::invalid_config(format!(
                    "resolution must be positive, got {x_res} x {y_res}"
                )));
            }
        }

        if let Some(bounds) = &self.output_bounds {
            if bounds.min_x >= bounds.max_x || bounds.min_y >= bounds.max_y {
                return Err(VrtBuildError::invalid_config(format!(
                    "output bounds are empty: [{}, {}, {}, {}]",
                    bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
                )));
            }
        }

        if self.target_aligned_pixels
            && !matches!(self.resolution, ResolutionPolicy::User { .. })
        {
            return Err(VrtBuildError::invalid_config(
                "target_aligned_pixels requires an explicit resolution".to_string(),
            ));
        }

        if let Some(bands) = &self.band_list {
            if self.separate {
                return Err(VrtBuildError::invalid_config(
                    "band_list cannot be combined with separate".to_string(),
                ));
            }
            if bands.is_empty() || bands.contains(&0) {
                return Err(VrtBuildError::invalid_config(
                    "band_list must contain 1-based band indices".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(BuildOptions::default().validate().is_ok());
    }

    #[test]
    fn test_negative_resolution_rejected() {
        let options = BuildOptions {
            resolution: ResolutionPolicy::User {
                x_res: -30.0,
                y_res: 60.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(VrtBuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_bounds_rejected() {
        let options = BuildOptions {
            output_bounds: Some(BoundingBox::new(10.0, 0.0, 10.0, 5.0)),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_tap_requires_user_resolution() {
        let options = BuildOptions {
            target_aligned_pixels: true,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = BuildOptions {
            target_aligned_pixels: true,
            resolution: ResolutionPolicy::User {
                x_res: 30.0,
                y_res: 60.0,
            },
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_band_list_with_separate_rejected() {
        let options = BuildOptions {
            separate: true,
            band_list: Some(vec![1]),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_resampling_from_name() {
        assert_eq!(ResamplingMethod::from_name("NEAR"), ResamplingMethod::Nearest);
        assert_eq!(
            ResamplingMethod::from_name("average"),
            ResamplingMethod::Average
        );
        assert_eq!(ResamplingMethod::from_name("cubic"), ResamplingMethod::Cubic);
    }
}
