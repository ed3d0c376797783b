//! Seston: A Fast, Modular Sentinel-3 OLCI TSM Compositing Pipeline
//!
//! This library converts Sentinel-3 OLCI Level-2 ocean-colour swath products
//! into a time series of regularly-gridded, ROI-clipped, per-period composite
//! rasters of Total Suspended Matter (TSM): nearest-neighbor swath resampling,
//! negative-value reclassification, clipping to a region of interest, and
//! no-data-aware averaging of all passes within a day, week, month, season or
//! year.

pub mod types;
pub mod io;
pub mod core;
pub mod pipeline;

// Re-export main types and functions for easier access
pub use types::{
    BoundingBox, GeoTransform, Raster, Swath, TsmError, TsmResult, NO_DATA, WGS84_EPSG,
};

pub use io::{read_geotiff, read_swath, write_geotiff, Roi, SwathInputs};

pub use core::{
    clip, composite_rasters, extract_timestamp, group_by_period, reclassify, resample,
    AcquisitionKey, CompositeGroup, GridDefinition, Period,
};

pub use pipeline::{run, RunConfig, RunSummary};
