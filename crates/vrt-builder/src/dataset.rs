//! The openable mosaic dataset.

use std::path::Path;
use std::sync::Arc;

use raster_core::{
    BandInfo, GeoTransform, PixelWindow, RasterError, RasterOpener, RasterResult, RasterSource,
};

use crate::description::{EntrySummary, VrtDescription};
use crate::error::Result;
use crate::overview::{DecimationOverviewService, OverviewLevel, OverviewService};

/// A virtual mosaic, openable for read.
///
/// Implements [`RasterSource`], so a mosaic is indistinguishable from a
/// primary raster to downstream code and can feed another mosaic build.
/// Pixel reads composite the description's entries on demand: live sources
/// through their strong handle, path sources re-resolved through the opener
/// on every read.
pub struct VrtDataset {
    description: VrtDescription,
    destination: Option<String>,
    opener: Arc<dyn RasterOpener>,
    overviews: Vec<OverviewLevel>,
}

impl VrtDataset {
    pub(crate) fn new(
        description: VrtDescription,
        destination: Option<String>,
        opener: Arc<dyn RasterOpener>,
    ) -> Self {
        Self {
            description,
            destination,
            opener,
            overviews: Vec::new(),
        }
    }

    /// The mosaic description backing this dataset.
    pub fn vrt(&self) -> &VrtDescription {
        &self.description
    }

    /// Flattened per-entry windows, for tooling and tests.
    pub fn entry_summaries(&self) -> Vec<EntrySummary> {
        self.description.entry_summaries()
    }

    /// The description in its persisted XML form.
    pub fn to_xml(&self) -> String {
        self.description.to_xml()
    }

    /// Per-band checksum of the composed pixels.
    pub fn checksum(&self, band: usize) -> Result<u32> {
        Ok(raster_core::band_checksum(self, band)?)
    }

    /// Build overview levels through the given service and record them in
    /// the description. A persisted dataset is rewritten in place so the
    /// overviews survive reopening.
    pub fn build_overviews(
        &mut self,
        service: &dyn OverviewService,
        method: crate::config::ResamplingMethod,
        factors: &[u32],
    ) -> Result<()> {
        let levels = service.build(self, method, factors)?;
        self.overviews = levels;
        self.description.overview_factors = factors.to_vec();
        self.description.overview_resampling = method;

        if let Some(destination) = &self.destination {
            self.description.write_to(Path::new(destination))?;
        }

        tracing::debug!(
            count = self.overviews.len(),
            method = %method,
            "built overviews"
        );
        Ok(())
    }

    /// Number of overview levels available.
    pub fn overview_count(&self) -> usize {
        self.overviews.len()
    }

    /// Access an overview level by index, finest first.
    pub fn overview(&self, index: usize) -> Option<&OverviewLevel> {
        self.overviews.get(index)
    }

    fn read_alpha(
        &self,
        band: &crate::description::VrtBand,
        window: PixelWindow,
    ) -> Vec<f64> {
        let mut out = vec![0.0; window.x_size * window.y_size];
        for entry in &band.sources {
            let Some(overlap) = entry.dst_rect.intersect(&window) else {
                continue;
            };
            for y in overlap.y_off..overlap.y_end() {
                for x in overlap.x_off..overlap.x_end() {
                    let row = (y - window.y_off) as usize;
                    let col = (x - window.x_off) as usize;
                    out[row * window.x_size + col] = 255.0;
                }
            }
        }
        out
    }
}

// Not derivable: the opener is a trait object.
impl std::fmt::Debug for VrtDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VrtDataset")
            .field("description", &self.description)
            .field("destination", &self.destination)
            .field("overviews", &self.overviews.len())
            .finish_non_exhaustive()
    }
}

impl RasterSource for VrtDataset {
    fn width(&self) -> usize {
        self.description.grid.width
    }

    fn height(&self) -> usize {
        self.description.grid.height
    }

    fn geotransform(&self) -> GeoTransform {
        self.description.grid.geotransform
    }

    fn band_count(&self) -> usize {
        self.description.bands.len()
    }

    fn band_info(&self, band: usize) -> RasterResult<BandInfo> {
        self.description
            .bands
            .get(band.wrapping_sub(1))
            .map(|b| BandInfo {
                data_type: b.data_type,
                no_data: b.no_data,
            })
            .ok_or_else(|| RasterError::invalid_band(band, self.description.bands.len()))
    }

    fn read_band(&self, band: usize, window: PixelWindow) -> RasterResult<Vec<f64>> {
        let band_def = self
            .description
            .bands
            .get(band.wrapping_sub(1))
            .ok_or_else(|| RasterError::invalid_band(band, self.description.bands.len()))?;

        if !window.fits_within(self.width(), self.height()) {
            return Err(RasterError::window_out_of_bounds(
                window,
                self.width(),
                self.height(),
            ));
        }

        if band_def.alpha {
            return Ok(self.read_alpha(band_def, window));
        }

        let fill = band_def.no_data.unwrap_or(0.0);
        let mut out = vec![fill; window.x_size * window.y_size];

        for entry in &band_def.sources {
            let Some(overlap) = entry.dst_rect.intersect(&window) else {
                continue;
            };

            let source = entry.source.resolve(&*self.opener)?;
            let src_data = source.read_band(entry.source_band, entry.src_rect)?;

            // Nearest-neighbor mapping from output pixels back into the
            // source sub-window; the two rects cover the same georeferenced
            // region at possibly different resolutions.
            let x_ratio = entry.src_rect.x_size as f64 / entry.dst_rect.x_size as f64;
            let y_ratio = entry.src_rect.y_size as f64 / entry.dst_rect.y_size as f64;

            for y in overlap.y_off..overlap.y_end() {
                let dy = (y - entry.dst_rect.y_off) as f64;
                let sy = (((dy + 0.5) * y_ratio).floor() as usize)
                    .min(entry.src_rect.y_size - 1);
                for x in overlap.x_off..overlap.x_end() {
                    let dx = (x - entry.dst_rect.x_off) as f64;
                    let sx = (((dx + 0.5) * x_ratio).floor() as usize)
                        .min(entry.src_rect.x_size - 1);

                    let row = (y - window.y_off) as usize;
                    let col = (x - window.x_off) as usize;
                    out[row * window.x_size + col] =
                        src_data[sy * entry.src_rect.x_size + sx];
                }
            }
        }

        Ok(out)
    }

    fn description(&self) -> Option<&str> {
        self.destination.as_deref()
    }
}

/// Reopen a persisted mosaic description.
///
/// Path sources inside the description resolve through `opener` at read
/// time; recorded overview factors are materialized so the reopened
/// dataset reports the same overview levels.
pub fn open_vrt(path: &str, opener: Arc<dyn RasterOpener>) -> Result<VrtDataset> {
    let xml = std::fs::read_to_string(path)?;
    let description = VrtDescription::from_xml(&xml)?;

    let factors = description.overview_factors.clone();
    let resampling = description.overview_resampling;

    let mut dataset = VrtDataset::new(description, Some(path.to_string()), opener);
    if !factors.is_empty() {
        dataset.overviews = DecimationOverviewService.build(&dataset, resampling, &factors)?;
    }

    Ok(dataset)
}

/// Default opener: resolves names as persisted mosaic descriptions on the
/// filesystem, recursively.
#[derive(Debug, Clone, Copy, Default)]
pub struct VrtFileOpener;

impl RasterOpener for VrtFileOpener {
    fn open(&self, name: &str) -> RasterResult<Arc<dyn RasterSource>> {
        let dataset = open_vrt(name, Arc::new(Self))
            .map_err(|e| RasterError::open_failed(format!("{name}: {e}")))?;
        Ok(Arc::new(dataset))
    }
}
