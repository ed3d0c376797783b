//! Core raster processing modules

pub mod clip;
pub mod composite;
pub mod grid;
pub mod period;
pub mod reclassify;
pub mod resample;

// Re-export main types
pub use clip::clip;
pub use composite::{composite_rasters, group_by_period, CompositeGroup, CompositorReport};
pub use grid::GridDefinition;
pub use period::{extract_timestamp, AcquisitionKey, Period};
pub use reclassify::reclassify;
pub use resample::{resample, DEFAULT_RADIUS_OF_INFLUENCE_M};
