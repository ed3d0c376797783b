//! Downloaded-product housekeeping: archive extraction and pruning of each
//! `.SEN3` directory down to a configured allow-list of netCDF files. Both
//! operations take explicit path parameters and never touch process state.

use crate::types::{TsmError, TsmResult};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use zip::ZipArchive;

/// Counters for one archive-extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub extracted: usize,
    pub corrupt: usize,
}

/// Counters for one pruning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub deleted: usize,
    pub kept: usize,
}

/// Extract every `*.zip` archive in `directory` into `directory` and delete
/// the archive afterwards. A malformed zip is logged, counted and skipped;
/// extraction continues with the remaining archives.
pub fn extract_archives(directory: &Path) -> TsmResult<ExtractionStats> {
    let mut stats = ExtractionStats::default();

    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        let is_zip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if !path.is_file() || !is_zip {
            continue;
        }

        match extract_one(&path, directory) {
            Ok(()) => {
                fs::remove_file(&path)?;
                stats.extracted += 1;
                log::info!("Extracted archive: {}", path.display());
            }
            Err(TsmError::CorruptArchive(p)) => {
                stats.corrupt += 1;
                log::warn!("Skipping corrupt archive: {}", p.display());
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "Archive extraction complete: {} extracted, {} corrupt",
        stats.extracted,
        stats.corrupt
    );
    Ok(stats)
}

fn extract_one(archive_path: &Path, target_dir: &Path) -> TsmResult<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|_| TsmError::CorruptArchive(archive_path.to_path_buf()))?;
    archive
        .extract(target_dir)
        .map_err(|_| TsmError::CorruptArchive(archive_path.to_path_buf()))
}

/// In every `*.SEN3` directory under `base_dir`, delete regular files whose
/// name is not in `files_to_keep`. Subdirectories are left alone.
pub fn prune_product_files(
    base_dir: &Path,
    files_to_keep: &HashSet<String>,
) -> TsmResult<PruneStats> {
    let mut stats = PruneStats::default();

    for entry in fs::read_dir(base_dir)? {
        let product_dir = entry?.path();
        let is_product = product_dir.is_dir()
            && product_dir
                .extension()
                .map(|ext| ext == "SEN3")
                .unwrap_or(false);
        if !is_product {
            continue;
        }

        for file_entry in fs::read_dir(&product_dir)? {
            let file_path = file_entry?.path();
            if !file_path.is_file() {
                continue;
            }
            let keep = file_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| files_to_keep.contains(n))
                .unwrap_or(false);

            if keep {
                stats.kept += 1;
            } else {
                fs::remove_file(&file_path)?;
                stats.deleted += 1;
                log::debug!("Deleted: {}", file_path.display());
            }
        }
    }

    log::info!(
        "Product cleanup complete: deleted {}, kept {}",
        stats.deleted,
        stats.kept
    );
    Ok(stats)
}
