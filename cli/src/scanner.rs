use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use fs_err as fs;
use pazuzu_sdk::manifest::ENCRYPTED_SUFFIX;
use tracing::{debug, warn};

use crate::rules::Rules;

/// Outcome of scanning a target directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Eligible files, in traversal order.
    pub files: Vec<PathBuf>,
    pub dir_count: u64,
    /// Best-effort total size of the eligible files.
    pub total_bytes: u64,
}

/// Enumerates the regular files under `root` that are eligible for
/// encryption.
///
/// Files that already carry the `.pazuzu` suffix and the manifest file itself
/// are never selected, so a second scan of an encrypted tree comes up empty.
/// Symlinks are not followed.
pub fn scan(root: &Path, rules: &Rules, exclude_path: Option<&Path>) -> Result<ScanResult> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => bail!("target path is not a directory: {}", root.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("target directory does not exist: {}", root.display())
        }
        Err(err) => return Err(err).context("failed to inspect target directory"),
    }
    let exclude_path = exclude_path.map(std::path::absolute).transpose()?;
    let mut result = ScanResult::default();
    walk(root, rules, exclude_path.as_deref(), &mut result)?;
    Ok(result)
}

fn walk(
    dir: &Path,
    rules: &Rules,
    exclude_path: Option<&Path>,
    result: &mut ScanResult,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!("cannot inspect {}: {err}", path.display());
                continue;
            }
        };
        if file_type.is_symlink() {
            warn!("skipping symlink: {}", path.display());
            continue;
        }
        if file_type.is_dir() {
            result.dir_count += 1;
            walk(&path, rules, exclude_path, result)?;
            continue;
        }
        if path
            .extension()
            .is_some_and(|extension| extension == ENCRYPTED_SUFFIX)
        {
            continue;
        }
        if let Some(exclude) = exclude_path {
            if std::path::absolute(&path).is_ok_and(|path| path == exclude) {
                continue;
            }
        }
        if !rules.matches(&path) {
            debug!("excluded by rules: {}", path.display());
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => result.total_bytes += metadata.len(),
            Err(err) => debug!("cannot read size of {}: {err}", path.display()),
        }
        result.files.push(path);
    }
    Ok(())
}
