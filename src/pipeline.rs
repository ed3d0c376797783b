//! End-to-end batch orchestration: archive extraction, product pruning,
//! per-product resample/reclassify/clip, and per-period compositing. Stages
//! are stateless transformations over one product at a time, so the
//! per-product loop runs on a rayon worker pool with no shared mutable state;
//! the ROI is loaded once and shared read-only.

use crate::core::composite::run_compositor;
use crate::core::grid::GridDefinition;
use crate::core::period::Period;
use crate::core::reclassify::reclassify;
use crate::core::resample::{resample, DEFAULT_RADIUS_OF_INFLUENCE_M};
use crate::core::clip::clip;
use crate::io::geotiff::write_geotiff;
use crate::io::ingest::{extract_archives, prune_product_files};
use crate::io::roi::Roi;
use crate::io::swath::{read_swath, SwathInputs};
use crate::types::{TsmError, TsmResult, WGS84_EPSG};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// netCDF files retained inside each product directory during pruning,
/// matching a typical OLCI Level-2 water product
pub const DEFAULT_FILES_TO_KEEP: &[&str] = &[
    "cloud.nc",
    "common_flags.nc",
    "cqsf.nc",
    "geo_coordinates.nc",
    "iop_nn.nc",
    "par.nc",
    "tie_geo_coordinates.nc",
    "tie_geometries.nc",
    "time_coordinates.nc",
    "tsm_nn.nc",
    "trsp.nc",
    "wqsf.nc",
];

/// Full configuration surface of one processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding downloaded archives and/or `.SEN3` product folders
    pub base_dir: PathBuf,
    /// Vector file with the region of interest
    pub roi_path: PathBuf,
    /// Output resolution in degrees
    pub cell_size_deg: f64,
    /// Nearest-neighbor search radius in meters
    pub radius_of_influence_m: f64,
    /// Allow-list for product-directory pruning; empty disables pruning
    pub files_to_keep: Vec<String>,
    /// Temporal aggregation granularity for compositing
    pub period: Period,
    /// Which netCDF files/variables make up a swath
    pub swath_inputs: SwathInputs,
}

impl RunConfig {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(base_dir: P, roi_path: Q) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            roi_path: roi_path.as_ref().to_path_buf(),
            cell_size_deg: GridDefinition::DEFAULT_CELL_SIZE_DEG,
            radius_of_influence_m: DEFAULT_RADIUS_OF_INFLUENCE_M,
            files_to_keep: DEFAULT_FILES_TO_KEEP.iter().map(|s| s.to_string()).collect(),
            period: Period::Daily,
            swath_inputs: SwathInputs::default(),
        }
    }

    fn geotiff_dir(&self) -> PathBuf {
        self.base_dir.join("geotiff")
    }

    fn reclassified_dir(&self) -> PathBuf {
        self.base_dir.join("geotiff_reclassified")
    }

    fn clipped_dir(&self) -> PathBuf {
        self.base_dir.join("geotiff_reclass_clipped")
    }

    fn composite_dir(&self) -> PathBuf {
        self.clipped_dir().join(format!("{}_composites", self.period))
    }
}

/// Per-stage bookkeeping for the end-of-run report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub processed: usize,
    pub skipped: BTreeMap<&'static str, usize>,
    pub failed: usize,
}

impl StageCounts {
    fn skip(&mut self, reason: &'static str) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// End-of-run summary: counts of processed, skipped-by-reason and failed
/// items per stage
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub archives_extracted: usize,
    pub archives_corrupt: usize,
    pub files_pruned: usize,
    pub products: StageCounts,
    pub composites_written: usize,
    pub composites_failed: usize,
    pub files_without_timestamp: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run summary:")?;
        writeln!(
            f,
            "  archives: {} extracted, {} corrupt",
            self.archives_extracted, self.archives_corrupt
        )?;
        writeln!(f, "  pruned files: {}", self.files_pruned)?;
        writeln!(
            f,
            "  products: {} processed, {} skipped, {} failed",
            self.products.processed,
            self.products.skipped_total(),
            self.products.failed
        )?;
        for (reason, count) in &self.products.skipped {
            writeln!(f, "    skipped ({}): {}", reason, count)?;
        }
        writeln!(
            f,
            "  composites: {} written, {} failed",
            self.composites_written, self.composites_failed
        )?;
        write!(
            f,
            "  files without timestamp token: {}",
            self.files_without_timestamp
        )
    }
}

/// Outcome of one product's resample/reclassify/clip chain
enum ProductOutcome {
    Clipped(PathBuf),
    Skipped(&'static str),
    Failed,
}

/// Run the full pipeline over `config.base_dir`. Per-item failures are logged
/// and skipped; systemic problems (unreadable ROI, unwritable output
/// directories, invalid configuration) abort immediately.
pub fn run(config: &RunConfig) -> TsmResult<RunSummary> {
    if !(config.cell_size_deg > 0.0) {
        return Err(TsmError::Config(format!(
            "cell size must be positive, got {}",
            config.cell_size_deg
        )));
    }
    if !(config.radius_of_influence_m > 0.0) {
        return Err(TsmError::Config(format!(
            "radius of influence must be positive, got {}",
            config.radius_of_influence_m
        )));
    }
    if !config.base_dir.is_dir() {
        return Err(TsmError::Config(format!(
            "base directory {} does not exist",
            config.base_dir.display()
        )));
    }

    log::info!("🛰️  Starting TSM pipeline over {}", config.base_dir.display());

    // Systemic preconditions first: a config error retried per product is
    // wasted work
    let roi = Roi::from_file(&config.roi_path, WGS84_EPSG)?;
    for dir in [
        config.geotiff_dir(),
        config.reclassified_dir(),
        config.clipped_dir(),
        config.composite_dir(),
    ] {
        fs::create_dir_all(&dir)?;
    }

    let mut summary = RunSummary::default();

    // Step 1: unzip downloaded archives
    let extraction = extract_archives(&config.base_dir)?;
    summary.archives_extracted = extraction.extracted;
    summary.archives_corrupt = extraction.corrupt;

    // Step 2: prune product directories down to the allow-list
    if !config.files_to_keep.is_empty() {
        let keep: HashSet<String> = config.files_to_keep.iter().cloned().collect();
        let pruned = prune_product_files(&config.base_dir, &keep)?;
        summary.files_pruned = pruned.deleted;
    }

    // Steps 3-5: per-product swath -> grid -> reclassify -> clip
    let products = find_products(&config.base_dir)?;
    log::info!("Found {} product(s)", products.len());

    let outcomes: Vec<ProductOutcome> = products
        .par_iter()
        .map(|product_dir| match process_product(product_dir, config, &roi) {
            Ok(clipped) => ProductOutcome::Clipped(clipped),
            Err(e) if e.is_per_item() => {
                log::warn!("Skipping {}: {}", product_dir.display(), e);
                ProductOutcome::Skipped(e.reason())
            }
            Err(e) => {
                log::error!("Failed on {}: {}", product_dir.display(), e);
                ProductOutcome::Failed
            }
        })
        .collect();

    let mut clipped_files = Vec::new();
    for outcome in outcomes {
        match outcome {
            ProductOutcome::Clipped(path) => {
                summary.products.processed += 1;
                clipped_files.push(path);
            }
            ProductOutcome::Skipped(reason) => summary.products.skip(reason),
            ProductOutcome::Failed => summary.products.failed += 1,
        }
    }

    // Step 6: per-period composites; a failed bucket is reported in the
    // summary, never allowed to abort the remaining buckets
    let report = run_compositor(&clipped_files, config.period, &config.composite_dir());
    summary.composites_written = report.written.len();
    summary.composites_failed = report.failed_groups.len();
    summary.files_without_timestamp = report.rejected.len();

    log::info!("✅ Pipeline complete\n{}", summary);
    Ok(summary)
}

/// `.SEN3` product directories directly under `base_dir`, sorted for
/// deterministic processing order
fn find_products(base_dir: &Path) -> TsmResult<Vec<PathBuf>> {
    let mut products = Vec::new();
    for entry in fs::read_dir(base_dir)? {
        let path = entry?.path();
        let is_product = path.is_dir()
            && path.extension().map(|ext| ext == "SEN3").unwrap_or(false);
        if is_product {
            products.push(path);
        }
    }
    products.sort();
    Ok(products)
}

/// One product through the whole per-item chain, writing an intermediate
/// GeoTIFF after each stage so every artifact is externally inspectable
fn process_product(product_dir: &Path, config: &RunConfig, roi: &Roi) -> TsmResult<PathBuf> {
    let product_name = product_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            TsmError::InvalidFormat(format!("unrepresentable path {}", product_dir.display()))
        })?;
    let tif_name = format!("TSM_{}.tif", product_name);

    let swath = read_swath(product_dir, &config.swath_inputs)?;
    let grid = GridDefinition::from_swath(&swath, config.cell_size_deg)?;
    let raster = resample(&swath, &grid, config.radius_of_influence_m)?;
    write_geotiff(&raster, config.geotiff_dir().join(&tif_name))?;

    let reclassified = reclassify(&raster);
    write_geotiff(&reclassified, config.reclassified_dir().join(&tif_name))?;

    let clipped = clip(&reclassified, roi)?;
    let clipped_path = config.clipped_dir().join(&tif_name);
    write_geotiff(&clipped, &clipped_path)?;

    log::info!("✅ {}", tif_name);
    Ok(clipped_path)
}
