//! Virtual Raster Mosaic Builder
//!
//! This crate assembles a set of co-registered raster sources into a
//! lightweight virtual mosaic: a description of which pixel window of each
//! source lands where in a merged output grid, with no pixel data copied.
//! The description can be kept in-memory, persisted to a file, reopened,
//! and read through the generic raster API.
//!
//! # Architecture
//!
//! ```text
//! build_vrt(destination, sources, options, progress)
//!      │
//!      ├─► resolve_sources: paths / open handles → SourceDescriptors
//!      │
//!      ├─► resolve_output_grid: union extent + resolution policy
//!      │
//!      ├─► map_source (per source): geographic overlap → SrcRect/DstRect
//!      │        │
//!      │        └─► progress callback (may cancel)
//!      │
//!      └─► VrtDescription → VrtDataset (openable, recursable)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vrt_builder::{build_vrt, BuildOptions};
//!
//! let sources: Vec<Arc<dyn RasterSource>> = vec![src1, src2];
//! let mosaic = build_vrt(None, sources, &BuildOptions::default(), None)?;
//!
//! let checksum = mosaic.checksum(1)?;
//! let xml = mosaic.to_xml();
//! ```

pub mod builder;
pub mod config;
pub mod dataset;
pub mod description;
pub mod error;
pub mod extent;
pub mod geometry;
pub mod overview;
pub mod progress;
pub mod resolver;

// Re-export commonly used types at crate root
pub use builder::build_vrt;
pub use config::{BuildOptions, EmptyOverlapPolicy, ResamplingMethod, ResolutionPolicy};
pub use dataset::{open_vrt, VrtDataset, VrtFileOpener};
pub use description::{EntrySummary, MosaicEntry, VrtBand, VrtDescription};
pub use error::{Result, VrtBuildError};
pub use extent::OutputGrid;
pub use geometry::{map_source, SourceMapping};
pub use overview::{DecimationOverviewService, OverviewLevel, OverviewService};
pub use progress::{ProgressFn, ProgressSignal};
pub use resolver::{resolve_sources, SourceDescriptor, SourceList, SourceRef};
