use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Error, Result, bail};
use fs_err as fs;
use pazuzu_sdk::{
    crypto::{self, FileKey},
    manifest::{Manifest, ManifestEntry, append_entry, encrypted_path},
    provider::{Provider, ProviderResult},
};
use tracing::{debug, info, warn};

use crate::{
    counters::{EncryptStats, FileOutcome},
    rules::Rules,
    scanner,
};

/// Result of an encryption run.
#[derive(Debug)]
pub struct EncryptOutcome {
    pub stats: EncryptStats,
    /// `None` for dry runs and runs that encrypted nothing.
    pub upload: Option<ProviderResult>,
    pub manifest_path: PathBuf,
}

/// Encrypts every eligible file under `root` and stores the manifest with
/// `provider`.
///
/// Each file gets its own fresh key. Per file the order is: encrypt, write
/// the `.pazuzu` ciphertext, append the manifest row, delete the plaintext.
/// An interruption can orphan at most one ciphertext file but never loses
/// plaintext, and the manifest on disk always covers everything encrypted so
/// far. One inaccessible file never aborts the run.
pub async fn encrypt_directory(
    provider: &Provider,
    rules: &Rules,
    root: &Path,
    manifest_path: &Path,
    dry_run: bool,
    files: Option<Vec<PathBuf>>,
) -> Result<EncryptOutcome> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => bail!("target path is not a directory: {}", root.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("target directory does not exist: {}", root.display())
        }
        Err(err) => return Err(err).context("failed to inspect target directory"),
    }
    let files = match files {
        Some(files) => files,
        None => scanner::scan(root, rules, Some(manifest_path))?.files,
    };
    debug!(
        "encrypting {} files under {} (manifest: {})",
        files.len(),
        root.display(),
        manifest_path.display()
    );

    let mut stats = EncryptStats::default();
    let mut manifest = Manifest::default();
    for path in &files {
        stats.total += 1;
        match process_file(path, manifest_path, &mut manifest, dry_run) {
            FileOutcome::Done { bytes } => {
                stats.encrypted += 1;
                stats.bytes += bytes;
            }
            FileOutcome::Skipped { reason } => {
                warn!("skipping {}: {reason}", path.display());
                stats.skipped += 1;
            }
            FileOutcome::Failed { error } => {
                warn!("failed to encrypt {}: {error:#}", path.display());
                stats.record_failure(format!("{}: {error:#}", path.display()));
            }
        }
    }

    let mut outcome = EncryptOutcome {
        stats,
        upload: None,
        manifest_path: manifest_path.to_path_buf(),
    };
    // Reported before the upload so the counts survive a provider failure;
    // per-file work is never rolled back.
    outcome.stats.report(dry_run);
    if dry_run {
        info!("dry run complete; nothing was modified");
        return Ok(outcome);
    }
    if outcome.stats.encrypted == 0 {
        info!("no files were encrypted; skipping manifest upload");
        return Ok(outcome);
    }
    debug!(
        "uploading manifest with {} rows via {}",
        manifest.len(),
        provider.name()
    );
    let upload = provider.upload(manifest_path).await?;
    info!(
        "encrypted {} files; manifest stored at {}",
        outcome.stats.encrypted, upload.destination
    );
    outcome.upload = Some(upload);
    Ok(outcome)
}

fn process_file(
    path: &Path,
    manifest_path: &Path,
    manifest: &mut Manifest,
    dry_run: bool,
) -> FileOutcome {
    let plaintext = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // Vanished since scanning; somebody else got there first.
            return FileOutcome::Skipped {
                reason: "file no longer exists".into(),
            };
        }
        Err(err) => {
            return FileOutcome::Skipped {
                reason: err.to_string(),
            };
        }
    };
    let bytes = plaintext.len() as u64;
    if dry_run {
        debug!("would encrypt {}", path.display());
        return FileOutcome::Done { bytes };
    }

    let key = FileKey::generate();
    let ciphertext = match crypto::encrypt(&plaintext, &key) {
        Ok(ciphertext) => ciphertext,
        Err(error) => return FileOutcome::Failed { error },
    };
    let target = encrypted_path(path);
    if let Err(err) = fs::write(&target, &ciphertext) {
        return FileOutcome::Skipped {
            reason: err.to_string(),
        };
    }
    let entry = ManifestEntry {
        path: target.display().to_string(),
        key,
    };
    if let Err(err) = append_entry(manifest_path, &entry) {
        // A ciphertext file without a manifest row would be unrecoverable;
        // undo the write and keep the plaintext.
        if let Err(remove_err) = fs::remove_file(&target) {
            warn!(
                "failed to remove {} after manifest append failure: {remove_err}",
                target.display()
            );
        }
        return FileOutcome::Failed {
            error: Error::new(err).context("failed to append manifest row"),
        };
    }
    manifest.add_entry(entry);
    if let Err(err) = fs::remove_file(path) {
        // The row is recorded and the ciphertext is valid; only the
        // plaintext copy stays behind.
        warn!("failed to remove plaintext {}: {err}", path.display());
    }
    debug!("encrypted {} -> {}", path.display(), target.display());
    FileOutcome::Done { bytes }
}
