//! Source resolution: normalize heterogeneous inputs into descriptors.

use std::sync::Arc;

use raster_core::{BandInfo, GeoTransform, RasterOpener, RasterSource};

use crate::error::{Result, VrtBuildError};

/// Heterogeneous source input accepted by the build entry point.
pub enum SourceList {
    /// A single resolvable path or name.
    Path(String),
    /// A sequence of resolvable paths or names.
    Paths(Vec<String>),
    /// A single already-open raster.
    Raster(Arc<dyn RasterSource>),
    /// A sequence of already-open rasters.
    Rasters(Vec<Arc<dyn RasterSource>>),
}

impl From<&str> for SourceList {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for SourceList {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<String>> for SourceList {
    fn from(paths: Vec<String>) -> Self {
        Self::Paths(paths)
    }
}

impl From<Vec<&str>> for SourceList {
    fn from(paths: Vec<&str>) -> Self {
        Self::Paths(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<Arc<dyn RasterSource>> for SourceList {
    fn from(raster: Arc<dyn RasterSource>) -> Self {
        Self::Raster(raster)
    }
}

impl From<Vec<Arc<dyn RasterSource>>> for SourceList {
    fn from(rasters: Vec<Arc<dyn RasterSource>>) -> Self {
        Self::Rasters(rasters)
    }
}

/// Stable reference to an underlying raster.
///
/// Path references are re-resolved through the opener lazily on each read.
/// Live references hold the raster strongly, keeping unnamed in-memory
/// sources alive for as long as any description references them.
#[derive(Clone)]
pub enum SourceRef {
    Path(String),
    Live(Arc<dyn RasterSource>),
}

impl SourceRef {
    /// Name under which the source can be reopened, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            Self::Live(raster) => raster.description(),
        }
    }

    /// Resolve to an open raster handle.
    pub fn resolve(&self, opener: &dyn RasterOpener) -> raster_core::RasterResult<Arc<dyn RasterSource>> {
        match self {
            Self::Path(path) => opener.open(path),
            Self::Live(raster) => Ok(Arc::clone(raster)),
        }
    }
}

impl std::fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Live(raster) => f
                .debug_tuple("Live")
                .field(&raster.description().unwrap_or("<unnamed>"))
                .finish(),
        }
    }
}

/// Uniform per-source metadata produced by the resolver.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Stable reference to the underlying raster.
    pub reference: SourceRef,
    /// Pixel-to-georeferenced mapping.
    pub geotransform: GeoTransform,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Per-band metadata, in band order.
    pub bands: Vec<BandInfo>,
}

impl SourceDescriptor {
    /// Georeferenced extent of the source.
    pub fn extent(&self) -> raster_core::BoundingBox {
        self.geotransform.extent(self.width, self.height)
    }

    /// Human-readable label for messages.
    pub fn label(&self) -> &str {
        self.reference.name().unwrap_or("<in-memory>")
    }
}

/// Resolve a heterogeneous input into an ordered descriptor list.
///
/// Probing is read-only. Any entry that cannot be resolved to a readable,
/// axis-aligned raster fails the whole build.
pub fn resolve_sources(
    input: SourceList,
    opener: &dyn RasterOpener,
) -> Result<Vec<SourceDescriptor>> {
    enum Item {
        Path(String),
        Raster(Arc<dyn RasterSource>),
    }

    let items: Vec<Item> = match input {
        SourceList::Path(path) => vec![Item::Path(path)],
        SourceList::Paths(paths) => paths.into_iter().map(Item::Path).collect(),
        SourceList::Raster(raster) => vec![Item::Raster(raster)],
        SourceList::Rasters(rasters) => rasters.into_iter().map(Item::Raster).collect(),
    };

    if items.is_empty() {
        return Err(VrtBuildError::invalid_source("no sources provided"));
    }

    let mut descriptors = Vec::with_capacity(items.len());
    for item in items {
        let descriptor = match item {
            Item::Path(path) => {
                let raster = opener.open(&path).map_err(|e| {
                    VrtBuildError::invalid_source(format!("{path}: {e}"))
                })?;
                probe(&raster, SourceRef::Path(path))?
            }
            Item::Raster(raster) => {
                let reference = reference_for_handle(&raster, opener);
                probe(&raster, reference)?
            }
        };
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}

/// Decide whether an open handle can be referenced by name alone.
///
/// The handle's name round-trips only if the opener can resolve it; an
/// unnamed or unregistered in-memory raster must be held directly so it
/// stays alive and addressable after the caller's handle goes out of scope.
fn reference_for_handle(
    raster: &Arc<dyn RasterSource>,
    opener: &dyn RasterOpener,
) -> SourceRef {
    if let Some(name) = raster.description() {
        if opener.open(name).is_ok() {
            return SourceRef::Path(name.to_string());
        }
    }
    SourceRef::Live(Arc::clone(raster))
}

fn probe(raster: &Arc<dyn RasterSource>, reference: SourceRef) -> Result<SourceDescriptor> {
    let label = reference.name().unwrap_or("<in-memory>").to_string();

    let width = raster.width();
    let height = raster.height();
    if width == 0 || height == 0 {
        return Err(VrtBuildError::invalid_source(format!(
            "{label}: raster has empty dimensions {width}x{height}"
        )));
    }

    let geotransform = raster.geotransform();
    if !geotransform.is_axis_aligned() {
        return Err(VrtBuildError::invalid_source(format!(
            "{label}: rotated or sheared rasters are not supported"
        )));
    }
    if geotransform.pixel_width == 0.0 || geotransform.pixel_height == 0.0 {
        return Err(VrtBuildError::invalid_source(format!(
            "{label}: raster has a zero pixel size"
        )));
    }

    let band_count = raster.band_count();
    if band_count == 0 {
        return Err(VrtBuildError::invalid_source(format!(
            "{label}: raster has no bands"
        )));
    }

    let mut bands = Vec::with_capacity(band_count);
    for band in 1..=band_count {
        bands.push(raster.band_info(band)?);
    }

    Ok(SourceDescriptor {
        reference,
        geotransform,
        width,
        height,
        bands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_core::{DataType, MemRaster, RasterError, RasterResult};

    struct NullOpener;

    impl RasterOpener for NullOpener {
        fn open(&self, name: &str) -> RasterResult<Arc<dyn RasterSource>> {
            Err(RasterError::open_failed(name.to_string()))
        }
    }

    fn mem_source(origin_x: f64) -> Arc<dyn RasterSource> {
        Arc::new(MemRaster::new(
            1,
            1,
            GeoTransform::new(origin_x, 49.0, 1.0, -1.0),
            1,
            DataType::Byte,
        ))
    }

    #[test]
    fn test_resolve_live_handles() {
        let descriptors = resolve_sources(
            SourceList::Rasters(vec![mem_source(2.0), mem_source(3.0)]),
            &NullOpener,
        )
        .unwrap();

        assert_eq!(descriptors.len(), 2);
        assert!(matches!(descriptors[0].reference, SourceRef::Live(_)));
        assert_eq!(descriptors[0].width, 1);
        assert_eq!(descriptors[1].geotransform.origin_x, 3.0);
    }

    #[test]
    fn test_named_but_unregistered_handle_stays_live() {
        let raster: Arc<dyn RasterSource> = Arc::new(
            MemRaster::new(
                1,
                1,
                GeoTransform::new(2.0, 49.0, 1.0, -1.0),
                1,
                DataType::Byte,
            )
            .with_name("i_have_a_name_but_nobody_can_open_me_through_it"),
        );

        let descriptors = resolve_sources(SourceList::Raster(raster), &NullOpener).unwrap();
        assert!(matches!(descriptors[0].reference, SourceRef::Live(_)));
    }

    #[test]
    fn test_unresolvable_path_fails() {
        let err = resolve_sources(SourceList::from("missing.vrt"), &NullOpener).unwrap_err();
        assert!(matches!(err, VrtBuildError::InvalidSource(_)));
    }

    #[test]
    fn test_empty_input_fails() {
        let err = resolve_sources(SourceList::Paths(vec![]), &NullOpener).unwrap_err();
        assert!(matches!(err, VrtBuildError::InvalidSource(_)));
    }

    #[test]
    fn test_rotated_source_rejected() {
        let mut gt = GeoTransform::new(0.0, 0.0, 1.0, -1.0);
        gt.row_rotation = 0.1;
        let raster: Arc<dyn RasterSource> =
            Arc::new(MemRaster::new(1, 1, gt, 1, DataType::Byte));

        let err = resolve_sources(SourceList::Raster(raster), &NullOpener).unwrap_err();
        assert!(matches!(err, VrtBuildError::InvalidSource(_)));
    }
}
