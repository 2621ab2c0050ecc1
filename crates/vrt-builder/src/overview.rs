//! Overview (pyramid) delegation.
//!
//! The builder itself never downsamples; it forwards to an
//! [`OverviewService`], the boundary to the external raster-processing
//! subsystem. [`DecimationOverviewService`] is the default in-process
//! implementation.

use raster_core::{MemRaster, PixelWindow, RasterSource};

use crate::config::ResamplingMethod;
use crate::dataset::VrtDataset;
use crate::error::{Result, VrtBuildError};

/// One downsampled copy of a dataset.
#[derive(Debug, Clone)]
pub struct OverviewLevel {
    /// Decimation factor relative to the full-resolution dataset.
    pub factor: u32,
    /// The downsampled pixels.
    pub raster: MemRaster,
}

/// Builds downsampled copies of a mosaic dataset.
pub trait OverviewService {
    /// Build one overview level per decimation factor, in order.
    fn build(
        &self,
        dataset: &VrtDataset,
        method: ResamplingMethod,
        factors: &[u32],
    ) -> Result<Vec<OverviewLevel>>;
}

/// Block-decimation overview builder.
///
/// `Average` takes the mean of each factor-sized block, skipping non-finite
/// samples; every other method decimates by taking the block's top-left
/// sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimationOverviewService;

impl OverviewService for DecimationOverviewService {
    fn build(
        &self,
        dataset: &VrtDataset,
        method: ResamplingMethod,
        factors: &[u32],
    ) -> Result<Vec<OverviewLevel>> {
        if factors.is_empty() {
            return Err(VrtBuildError::invalid_config(
                "overview factor list is empty".to_string(),
            ));
        }

        let width = dataset.width();
        let height = dataset.height();
        let band_count = dataset.band_count();

        let mut band_infos = Vec::with_capacity(band_count);
        let mut full_bands = Vec::with_capacity(band_count);
        for band in 1..=band_count {
            band_infos.push(dataset.band_info(band)?);
            full_bands.push(dataset.read_band(band, PixelWindow::full(width, height))?);
        }

        let mut levels = Vec::with_capacity(factors.len());
        for &factor in factors {
            if factor < 2 {
                return Err(VrtBuildError::invalid_config(format!(
                    "overview factor must be at least 2, got {factor}"
                )));
            }
            let f = factor as usize;
            let out_width = width.div_ceil(f);
            let out_height = height.div_ceil(f);

            let mut gt = dataset.geotransform();
            gt.pixel_width *= factor as f64;
            gt.pixel_height *= factor as f64;

            let mut raster = MemRaster::with_bands(out_width, out_height, gt, band_infos.clone());
            for (band_index, data) in full_bands.iter().enumerate() {
                let reduced =
                    decimate(data, width, height, out_width, out_height, f, method);
                raster.write_band(band_index + 1, reduced)?;
            }

            levels.push(OverviewLevel { factor, raster });
        }

        Ok(levels)
    }
}

fn decimate(
    data: &[f64],
    width: usize,
    height: usize,
    out_width: usize,
    out_height: usize,
    factor: usize,
    method: ResamplingMethod,
) -> Vec<f64> {
    let mut out = vec![0.0; out_width * out_height];
    for out_y in 0..out_height {
        for out_x in 0..out_width {
            let x0 = out_x * factor;
            let y0 = out_y * factor;

            let value = match method {
                ResamplingMethod::Average => {
                    let mut sum = 0.0;
                    let mut count = 0usize;
                    for y in y0..(y0 + factor).min(height) {
                        for x in x0..(x0 + factor).min(width) {
                            let v = data[y * width + x];
                            if v.is_finite() {
                                sum += v;
                                count += 1;
                            }
                        }
                    }
                    if count == 0 {
                        f64::NAN
                    } else {
                        sum / count as f64
                    }
                }
                _ => data[y0 * width + x0],
            };

            out[out_y * out_width + out_x] = value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimate_nearest() {
        let data: Vec<f64> = (1..=16).map(|v| v as f64).collect();
        let out = decimate(&data, 4, 4, 2, 2, 2, ResamplingMethod::Nearest);
        assert_eq!(out, vec![1.0, 3.0, 9.0, 11.0]);
    }

    #[test]
    fn test_decimate_average() {
        let data: Vec<f64> = (1..=16).map(|v| v as f64).collect();
        let out = decimate(&data, 4, 4, 2, 2, 2, ResamplingMethod::Average);
        // Top-left block: 1, 2, 5, 6.
        assert!((out[0] - 3.5).abs() < 1e-9);
        assert!((out[1] - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_decimate_odd_dimensions() {
        let data: Vec<f64> = (0..9).map(|v| v as f64).collect();
        let out = decimate(&data, 3, 3, 2, 2, 2, ResamplingMethod::Average);
        assert_eq!(out.len(), 4);
        // Bottom-right block is the single corner sample.
        assert!((out[3] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_decimate_average_skips_nan() {
        let data = vec![1.0, f64::NAN, 3.0, 4.0];
        let out = decimate(&data, 2, 2, 1, 1, 2, ResamplingMethod::Average);
        assert!((out[0] - 8.0 / 3.0).abs() < 1e-9);
    }
}
