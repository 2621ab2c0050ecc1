//! The mosaic build entry point.

use std::path::Path;
use std::sync::Arc;

use raster_core::{BandInfo, DataType};

use crate::config::{BuildOptions, EmptyOverlapPolicy};
use crate::dataset::VrtDataset;
use crate::description::{MosaicEntry, VrtBand, VrtDescription};
use crate::error::{Result, VrtBuildError};
use crate::extent::resolve_output_grid;
use crate::geometry::{map_source, SourceMapping};
use crate::progress::{ProgressFn, ProgressReporter};
use crate::resolver::{resolve_sources, SourceDescriptor, SourceList};

/// Build a virtual mosaic from a set of raster sources.
///
/// `destination` of `None` (or an empty string) keeps the description
/// purely in-memory; otherwise it is also written to the given path. The
/// optional progress callback fires once per processed source and may
/// cancel the build. On any failure no partial description is returned.
pub fn build_vrt(
    destination: Option<&str>,
    sources: impl Into<SourceList>,
    options: &BuildOptions,
    progress: Option<&ProgressFn<'_>>,
) -> Result<VrtDataset> {
    options.validate()?;

    let descriptors = resolve_sources(sources.into(), &*options.opener)?;
    tracing::debug!(count = descriptors.len(), "resolved sources");

    let grid = resolve_output_grid(&descriptors, options)?;
    tracing::debug!(
        width = grid.width,
        height = grid.height,
        "resolved output grid"
    );

    let mut reporter = ProgressReporter::new(progress, descriptors.len());
    let mut mappings: Vec<Option<SourceMapping>> = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        mappings.push(map_source(descriptor, &grid));
        reporter.step(&format!("processed {}", descriptor.label()))?;
    }

    let contributing = mappings.iter().flatten().count();
    if contributing == 0 && options.empty_overlap == EmptyOverlapPolicy::Fail {
        return Err(VrtBuildError::EmptyOverlap);
    }
    tracing::debug!(contributing, total = descriptors.len(), "mapped sources");

    let bands = assemble_bands(&descriptors, &mappings, options)?;
    let description = VrtDescription {
        grid,
        bands,
        overview_factors: Vec::new(),
        overview_resampling: options.resampling,
    };

    let destination = destination.filter(|d| !d.is_empty());
    if let Some(dest) = destination {
        description.write_to(Path::new(dest))?;
    }

    let dataset = VrtDataset::new(
        description,
        destination.map(str::to_string),
        Arc::clone(&options.opener),
    );

    reporter.finish()?;
    Ok(dataset)
}

fn assemble_bands(
    descriptors: &[SourceDescriptor],
    mappings: &[Option<SourceMapping>],
    options: &BuildOptions,
) -> Result<Vec<VrtBand>> {
    let mut bands = Vec::new();

    if options.separate {
        // One output band per source, fed by the source's first band.
        for (descriptor, mapping) in descriptors.iter().zip(mappings) {
            let info = descriptor.bands[0];
            bands.push(VrtBand {
                data_type: info.data_type,
                no_data: info.no_data,
                alpha: false,
                sources: mapping
                    .as_ref()
                    .map(|m| {
                        vec![MosaicEntry {
                            source: descriptor.reference.clone(),
                            source_band: 1,
                            src_rect: m.src_rect,
                            dst_rect: m.dst_rect,
                        }]
                    })
                    .unwrap_or_default(),
            });
        }
    } else {
        let first = &descriptors[0];
        let band_indices: Vec<usize> = match &options.band_list {
            Some(list) => {
                for &band in list {
                    if band > first.bands.len() {
                        return Err(VrtBuildError::invalid_config(format!(
                            "band {band} requested but sources have {} bands",
                            first.bands.len()
                        )));
                    }
                }
                list.clone()
            }
            None => (1..=first.bands.len()).collect(),
        };

        for &source_band in &band_indices {
            let info: BandInfo = first.bands[source_band - 1];
            let mut sources = Vec::new();
            for (descriptor, mapping) in descriptors.iter().zip(mappings) {
                if let Some(m) = mapping {
                    sources.push(MosaicEntry {
                        source: descriptor.reference.clone(),
                        source_band,
                        src_rect: m.src_rect,
                        dst_rect: m.dst_rect,
                    });
                }
            }
            bands.push(VrtBand {
                data_type: info.data_type,
                no_data: info.no_data,
                alpha: false,
                sources,
            });
        }
    }

    if options.add_alpha {
        let mut sources = Vec::new();
        for (descriptor, mapping) in descriptors.iter().zip(mappings) {
            if let Some(m) = mapping {
                sources.push(MosaicEntry {
                    source: descriptor.reference.clone(),
                    source_band: 1,
                    src_rect: m.src_rect,
                    dst_rect: m.dst_rect,
                });
            }
        }
        bands.push(VrtBand {
            data_type: DataType::Byte,
            no_data: None,
            alpha: true,
            sources,
        });
    }

    Ok(bands)
}
