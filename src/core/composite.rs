//! Temporal compositing: COLLECT clipped rasters, GROUP them by acquisition
//! period, align each group onto a common reference grid and REDUCE it with a
//! per-pixel mean over valid values. Multiple passes over the same period
//! partially overlap; averaging rewards pixels seen by more passes while
//! tolerating partial coverage from any single pass.
//!
//! Members come from independently derived grids, so their transforms never
//! match exactly. Alignment goes through each member's own transform: every
//! reference-grid pixel center samples the member cell that contains it.

use crate::core::period::{extract_timestamp, AcquisitionKey, Period};
use crate::types::{BoundingBox, GeoTransform, Raster, TsmError, TsmResult};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The set of rasters sharing one acquisition bucket
#[derive(Debug, Clone)]
pub struct CompositeGroup {
    pub key: AcquisitionKey,
    pub members: Vec<PathBuf>,
}

/// Bucket files by the acquisition timestamp embedded in their names.
/// Files with no extractable token are returned separately for reporting;
/// they are excluded from grouping, never silently merged into a bucket.
pub fn group_by_period(
    files: &[PathBuf],
    period: Period,
) -> (Vec<CompositeGroup>, Vec<(PathBuf, TsmError)>) {
    let mut groups: BTreeMap<AcquisitionKey, Vec<PathBuf>> = BTreeMap::new();
    let mut rejected = Vec::new();

    for path in files {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match extract_timestamp(file_name) {
            Ok(ts) => {
                let key = AcquisitionKey::for_period(ts, period);
                groups.entry(key).or_default().push(path.clone());
            }
            Err(e) => {
                log::warn!("Excluding {} from grouping: {}", path.display(), e);
                rejected.push((path.clone(), e));
            }
        }
    }

    let groups = groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort();
            CompositeGroup { key, members }
        })
        .collect();

    (groups, rejected)
}

/// Reduce a group of rasters to one composite: build a reference grid at the
/// first member's pixel size spanning the union of all member extents, sample
/// every member onto it through its own transform, then average per pixel
/// over non-no-data values. A pixel where every member is no-data stays
/// no-data. A group of one passes through unchanged.
///
/// Member pixel sizes need not match; each overpass derives its own grid, so
/// they differ by design. Members only have to share a CRS.
pub fn composite_rasters(members: &[Raster]) -> TsmResult<Raster> {
    let first = members.first().ok_or_else(|| {
        TsmError::Processing("cannot composite an empty group".to_string())
    })?;

    if members.len() == 1 {
        return Ok(first.clone());
    }

    for member in members {
        if member.epsg != first.epsg {
            return Err(TsmError::Processing(format!(
                "composite members disagree on CRS: EPSG:{} vs EPSG:{}",
                member.epsg, first.epsg
            )));
        }
    }

    let px = first.transform.pixel_width;
    let py = -first.transform.pixel_height;
    if !(px > 0.0 && py > 0.0) {
        return Err(TsmError::Processing(format!(
            "reference member has a degenerate pixel size ({} x {})",
            px, py
        )));
    }

    // Reference grid: union extent, anchored at the union's top-left corner
    let union = members
        .iter()
        .map(|m| m.bounding_box())
        .reduce(|a, b| a.union(&b))
        .expect("group is non-empty");

    let n_cols = (((union.max_lon - union.min_lon) / px - 1e-9).ceil() as usize).max(1);
    let n_rows = (((union.max_lat - union.min_lat) / py - 1e-9).ceil() as usize).max(1);

    log::debug!(
        "Compositing {} rasters onto {}x{} union grid",
        members.len(),
        n_rows,
        n_cols
    );

    let transform = GeoTransform::from_bounds(
        &BoundingBox {
            min_lon: union.min_lon,
            max_lon: union.min_lon + n_cols as f64 * px,
            min_lat: union.max_lat - n_rows as f64 * py,
            max_lat: union.max_lat,
        },
        n_cols,
        n_rows,
    );

    let data = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        let (lon, lat) = transform.pixel_center(r, c);
        let mut sum = 0.0f64;
        let mut count = 0u32;
        for member in members {
            if let Some(v) = sample_containing_cell(member, lon, lat) {
                sum += v as f64;
                count += 1;
            }
        }
        if count > 0 {
            (sum / count as f64) as f32
        } else {
            f32::NAN
        }
    });

    Ok(Raster::new(data, transform, first.epsg))
}

/// Value of the member cell containing (lon, lat), if that point falls inside
/// the member and the cell is valid
fn sample_containing_cell(member: &Raster, lon: f64, lat: f64) -> Option<f32> {
    let t = &member.transform;
    let col = ((lon - t.top_left_x) / t.pixel_width).floor();
    let row = ((t.top_left_y - lat) / -t.pixel_height).floor();
    if col < 0.0 || row < 0.0 {
        return None;
    }
    let (n_rows, n_cols) = member.data.dim();
    let (row, col) = (row as usize, col as usize);
    if row >= n_rows || col >= n_cols {
        return None;
    }
    let v = member.data[[row, col]];
    v.is_finite().then_some(v)
}

/// Load every member of a group from disk and reduce it to one raster
pub fn composite_group(group: &CompositeGroup) -> TsmResult<Raster> {
    let members = group
        .members
        .iter()
        .map(|p| crate::io::geotiff::read_geotiff(p))
        .collect::<TsmResult<Vec<_>>>()?;
    composite_rasters(&members)
}

/// Composite file name for an acquisition bucket, e.g. `TSM_daily_20180105.tif`
pub fn composite_file_name(period: Period, key: &AcquisitionKey) -> String {
    format!("TSM_{}_{}.tif", period, key.label)
}

/// Outcome of one compositor pass over a file set
#[derive(Debug, Default)]
pub struct CompositorReport {
    /// Composite files written, one per bucket that reduced cleanly
    pub written: Vec<PathBuf>,
    /// Input files excluded from grouping for lacking a timestamp token
    pub rejected: Vec<(PathBuf, TsmError)>,
    /// Buckets that failed to reduce or write, by label
    pub failed_groups: Vec<(String, TsmError)>,
}

/// COLLECT -> GROUP -> REDUCE -> EMIT over a set of clipped raster files,
/// writing one composite per bucket into `output_dir`. A bucket that fails to
/// reduce or write is logged and counted; the remaining buckets still run.
pub fn run_compositor(files: &[PathBuf], period: Period, output_dir: &Path) -> CompositorReport {
    let (groups, rejected) = group_by_period(files, period);
    log::info!(
        "Compositing {} file(s) into {} {} bucket(s)",
        files.len(),
        groups.len(),
        period
    );

    let mut report = CompositorReport {
        rejected,
        ..CompositorReport::default()
    };
    for group in &groups {
        let out_path = output_dir.join(composite_file_name(period, &group.key));
        let outcome = composite_group(group)
            .and_then(|composite| crate::io::geotiff::write_geotiff(&composite, &out_path));
        match outcome {
            Ok(()) => {
                log::info!(
                    "✅ {} ({} member{})",
                    out_path.display(),
                    group.members.len(),
                    if group.members.len() == 1 { "" } else { "s" }
                );
                report.written.push(out_path);
            }
            Err(e) => {
                log::warn!("Skipping {} bucket {}: {}", period, group.key.label, e);
                report.failed_groups.push((group.key.label.clone(), e));
            }
        }
    }

    report
}
