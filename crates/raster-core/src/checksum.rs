//! Deterministic per-band checksums used to verify read correctness.

use crate::error::RasterResult;
use crate::source::RasterSource;
use crate::types::PixelWindow;

/// Checksum a sample buffer.
///
/// Each sample is floored to an integer and weighted by its row-major
/// position (`(i % 255) + 1`), accumulated modulo 65536. Non-finite
/// samples count as zero. Two reads of the same pixels always agree;
/// reordering or altering any pixel changes the result.
pub fn checksum_of(samples: &[f64]) -> u32 {
    let mut sum: u64 = 0;
    for (i, &v) in samples.iter().enumerate() {
        let v = if v.is_finite() {
            (v.floor() as i64).rem_euclid(65536) as u64
        } else {
            0
        };
        sum = (sum + v * ((i % 255) as u64 + 1)) % 65536;
    }
    sum as u32
}

/// Checksum an entire band (1-based index) of a raster.
pub fn band_checksum(source: &dyn RasterSource, band: usize) -> RasterResult<u32> {
    let data = source.read_band(band, PixelWindow::full(source.width(), source.height()))?;
    Ok(checksum_of(&data))
}
