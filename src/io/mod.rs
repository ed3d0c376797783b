//! Input/output: swath product reading, GeoTIFF interchange, ROI loading and
//! archive housekeeping

pub mod geotiff;
pub mod ingest;
pub mod roi;
pub mod swath;

// Re-export main types
pub use geotiff::{read_geotiff, write_geotiff};
pub use ingest::{extract_archives, prune_product_files, ExtractionStats, PruneStats};
pub use roi::Roi;
pub use swath::{read_swath, SwathInputs};
