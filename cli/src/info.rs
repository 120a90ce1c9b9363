use std::fmt::Display;
use std::path::PathBuf;

use anyhow::Result;
use byte_unit::{Byte, UnitType};
use fs_err as fs;
use pazuzu_sdk::manifest::Manifest;
use tracing::{info, warn};

use crate::{config::Config, state};

const SAMPLE_ENTRIES: usize = 5;

pub fn pretty_size(size: u64) -> impl Display {
    format!(
        "{:.1}",
        Byte::from_u64(size).get_appropriate_unit(UnitType::Binary)
    )
}

/// Prints the last run summary and, when a manifest is available locally,
/// inspects it.
pub fn status(config: &Config, manifest_path: Option<PathBuf>) -> Result<()> {
    let summary = state::load_summary(&state::state_file_path(config)?)?;
    match &summary {
        Some(summary) => {
            let mode = if summary.dry_run { "dry run" } else { "live" };
            info!("last operation: {} ({mode})", summary.operation);
            info!("recorded at: {}", summary.timestamp.to_rfc3339());
            info!("provider: {}", summary.provider);
            info!(
                "files: {}, skipped: {}, failed: {}",
                summary.files, summary.skipped, summary.failed
            );
            info!("data processed: {}", pretty_size(summary.bytes));
            if let Some(destination) = &summary.destination {
                info!("destination: {destination}");
            }
            if let Some(id) = &summary.manifest_id {
                info!("manifest id: {id}");
            }
        }
        None => info!("no previous runs recorded"),
    }

    let manifest_path =
        manifest_path.or_else(|| summary.and_then(|summary| summary.manifest_path));
    let Some(manifest_path) = manifest_path else {
        return Ok(());
    };
    if !manifest_path.exists() {
        warn!(
            "manifest file is not available locally: {}",
            manifest_path.display()
        );
        return Ok(());
    }

    let manifest = Manifest::read(&manifest_path)?;
    info!("manifest: {}", manifest_path.display());
    info!(
        "manifest size: {}",
        pretty_size(fs::metadata(&manifest_path)?.len())
    );
    info!("entries: {}", manifest.len());
    for entry in manifest.entries().iter().take(SAMPLE_ENTRIES) {
        let key = entry.key.encode();
        info!("  {} (key {}...)", entry.path, &key[..12]);
    }
    if manifest.len() > SAMPLE_ENTRIES {
        info!("  ... and {} more entries", manifest.len() - SAMPLE_ENTRIES);
    }
    Ok(())
}
