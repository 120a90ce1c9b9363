use std::io;
use std::path::Path;

use anyhow::{Error, Result, anyhow};
use fs_err as fs;
use pazuzu_sdk::{
    crypto,
    manifest::{ENCRYPTED_SUFFIX, Manifest, ManifestEntry, original_path},
    provider::Provider,
};
use tracing::{debug, info, warn};

use crate::counters::{DecryptStats, FileOutcome};

/// Restores the files recorded in a stored manifest.
///
/// The manifest is fetched from `provider` by identifier and processed entry
/// by entry: a missing ciphertext file or a key that no longer matches
/// affects only that entry. Nothing is rolled back across entries.
pub async fn decrypt_from_manifest(
    provider: &Provider,
    manifest_id: &str,
    dry_run: bool,
) -> Result<DecryptStats> {
    info!("fetching manifest {manifest_id}");
    let content = provider.download(manifest_id).await?;
    let manifest = Manifest::parse(&content);
    debug!("manifest has {} entries", manifest.len());

    let mut stats = DecryptStats::default();
    for entry in manifest.entries() {
        stats.processed += 1;
        match restore_entry(entry, dry_run) {
            FileOutcome::Done { bytes } => {
                stats.restored += 1;
                stats.bytes += bytes;
            }
            FileOutcome::Skipped { reason } => {
                warn!("skipping {}: {reason}", entry.path);
                stats.skipped += 1;
            }
            FileOutcome::Failed { error } => {
                warn!("failed to restore {}: {error:#}", entry.path);
                stats.record_failure(format!("{}: {error:#}", entry.path));
            }
        }
    }
    stats.report(dry_run);
    Ok(stats)
}

fn restore_entry(entry: &ManifestEntry, dry_run: bool) -> FileOutcome {
    let encrypted = Path::new(&entry.path);
    let ciphertext = match fs::read(encrypted) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return FileOutcome::Skipped {
                reason: "encrypted file not found".into(),
            };
        }
        Err(err) => {
            return FileOutcome::Skipped {
                reason: err.to_string(),
            };
        }
    };
    if dry_run {
        debug!("would restore {}", entry.path);
        return FileOutcome::Done {
            bytes: ciphertext.len() as u64,
        };
    }

    let Some(target) = original_path(encrypted) else {
        return FileOutcome::Failed {
            error: anyhow!("entry path does not carry the .{ENCRYPTED_SUFFIX} suffix"),
        };
    };
    let plaintext = match crypto::decrypt(&ciphertext, &entry.key) {
        Ok(plaintext) => plaintext,
        Err(error) => {
            return FileOutcome::Failed {
                error: Error::new(error),
            };
        }
    };
    if let Err(err) = fs::write(&target, &plaintext) {
        return FileOutcome::Skipped {
            reason: err.to_string(),
        };
    }
    if let Err(err) = fs::remove_file(encrypted) {
        warn!("failed to remove ciphertext {}: {err}", entry.path);
    }
    debug!("restored {}", target.display());
    FileOutcome::Done {
        bytes: plaintext.len() as u64,
    }
}
