use anyhow::Error;
use tracing::{info, warn};

use crate::info::pretty_size;

/// At most this many per-file error messages are kept for the final report.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// What happened to a single file or manifest entry.
///
/// Benign conditions (the file vanished, the OS refused access) are skips;
/// anything unexpected is a failure with the error retained. The two are
/// separate variants so they can never be conflated by a catch-all handler.
pub enum FileOutcome {
    Done { bytes: u64 },
    Skipped { reason: String },
    Failed { error: Error },
}

#[derive(Debug, Default)]
pub struct EncryptStats {
    /// Candidate files seen, eligible or not to complete.
    pub total: u64,
    pub encrypted: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes: u64,
    pub errors: Vec<String>,
}

impl EncryptStats {
    pub fn record_failure(&mut self, message: String) {
        self.failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(message);
        }
    }

    pub fn report(&self, dry_run: bool) {
        let verb = if dry_run { "would encrypt" } else { "encrypted" };
        info!("scanned {} files", self.total);
        info!(
            "{verb} {} files ({})",
            self.encrypted,
            pretty_size(self.bytes)
        );
        if self.skipped > 0 {
            info!("skipped {} files", self.skipped);
        }
        if self.failed > 0 {
            warn!("failed on {} files:", self.failed);
            for message in &self.errors {
                warn!("  {message}");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct DecryptStats {
    /// Manifest entries processed.
    pub processed: u64,
    pub restored: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes: u64,
    pub errors: Vec<String>,
}

impl DecryptStats {
    pub fn record_failure(&mut self, message: String) {
        self.failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(message);
        }
    }

    pub fn report(&self, dry_run: bool) {
        let verb = if dry_run { "would restore" } else { "restored" };
        info!("processed {} manifest entries", self.processed);
        info!(
            "{verb} {} files ({})",
            self.restored,
            pretty_size(self.bytes)
        );
        if self.skipped > 0 {
            info!("skipped {} entries", self.skipped);
        }
        if self.failed > 0 {
            warn!("failed on {} entries:", self.failed);
            for message in &self.errors {
                warn!("  {message}");
            }
        }
    }
}
