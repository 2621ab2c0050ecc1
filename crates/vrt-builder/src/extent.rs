//! Output grid resolution: merged extent, resolution policy, dimensions.

use raster_core::{BoundingBox, GeoTransform};
use serde::{Deserialize, Serialize};

use crate::config::{BuildOptions, ResolutionPolicy};
use crate::error::{Result, VrtBuildError};
use crate::resolver::SourceDescriptor;

/// The georeferenced grid of the output mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputGrid {
    /// Pixel-to-georeferenced mapping of the output.
    pub geotransform: GeoTransform,
    /// Output width in pixels.
    pub width: usize,
    /// Output height in pixels.
    pub height: usize,
}

impl OutputGrid {
    /// Georeferenced extent of the output.
    pub fn extent(&self) -> BoundingBox {
        self.geotransform.extent(self.width, self.height)
    }
}

/// Derive the output grid from the sources and build options.
///
/// Bounds come from `output_bounds` or the union of all source extents;
/// resolution from the configured policy; dimensions from the extent/
/// resolution ratio rounded half away from zero, floored at one pixel.
pub fn resolve_output_grid(
    sources: &[SourceDescriptor],
    options: &BuildOptions,
) -> Result<OutputGrid> {
    if sources.is_empty() {
        return Err(VrtBuildError::invalid_source(
            "no sources to derive an output grid from",
        ));
    }

    if !options.separate {
        check_band_compatibility(sources)?;
    }

    let mut bounds = match options.output_bounds {
        Some(bounds) => bounds,
        None => {
            let mut union = sources[0].extent();
            for source in &sources[1..] {
                union = union.union(&source.extent());
            }
            union
        }
    };

    let (x_res, y_res) = match options.resolution {
        ResolutionPolicy::User { x_res, y_res } => (x_res, y_res),
        policy => policy_resolution(sources, policy),
    };

    if options.target_aligned_pixels {
        bounds.min_x = (bounds.min_x / x_res).floor() * x_res;
        bounds.max_x = (bounds.max_x / x_res).ceil() * x_res;
        bounds.min_y = (bounds.min_y / y_res).floor() * y_res;
        bounds.max_y = (bounds.max_y / y_res).ceil() * y_res;
    }

    let width = ((bounds.width() / x_res).round() as i64).max(1) as usize;
    let height = ((bounds.height() / y_res).round() as i64).max(1) as usize;

    Ok(OutputGrid {
        geotransform: GeoTransform::new(bounds.min_x, bounds.max_y, x_res, -y_res),
        width,
        height,
    })
}

fn policy_resolution(sources: &[SourceDescriptor], policy: ResolutionPolicy) -> (f64, f64) {
    let mut x_res = sources[0].geotransform.x_res();
    let mut y_res = sources[0].geotransform.y_res();

    match policy {
        ResolutionPolicy::Highest => {
            for source in &sources[1..] {
                x_res = x_res.min(source.geotransform.x_res());
                y_res = y_res.min(source.geotransform.y_res());
            }
        }
        ResolutionPolicy::Lowest => {
            for source in &sources[1..] {
                x_res = x_res.max(source.geotransform.x_res());
                y_res = y_res.max(source.geotransform.y_res());
            }
        }
        ResolutionPolicy::Average => {
            for source in &sources[1..] {
                x_res += source.geotransform.x_res();
                y_res += source.geotransform.y_res();
            }
            x_res /= sources.len() as f64;
            y_res /= sources.len() as f64;
        }
        ResolutionPolicy::User { .. } => unreachable!("handled by caller"),
    }

    (x_res, y_res)
}

fn check_band_compatibility(sources: &[SourceDescriptor]) -> Result<()> {
    let first = &sources[0];
    for source in &sources[1..] {
        if source.bands.len() != first.bands.len() {
            return Err(VrtBuildError::incompatible_grid(format!(
                "{} has {} bands but {} has {}",
                source.label(),
                source.bands.len(),
                first.label(),
                first.bands.len()
            )));
        }
        for (band, (a, b)) in first.bands.iter().zip(&source.bands).enumerate() {
            if a.data_type != b.data_type {
                return Err(VrtBuildError::incompatible_grid(format!(
                    "band {} is {} in {} but {} in {}",
                    band + 1,
                    a.data_type,
                    first.label(),
                    b.data_type,
                    source.label()
                )));
            }
        }
    }
    Ok(())
}
