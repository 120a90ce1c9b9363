use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Summary of the last encrypt or decrypt run, persisted for `status`.
/// Written best-effort after each run; never consumed by the workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub dry_run: bool,
    pub files: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
}

pub fn state_file_path(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.state_path {
        return Ok(path.clone());
    }
    let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("cannot find data dir"))?;
    Ok(data_dir.join("pazuzu").join("last_run.json"))
}

pub fn save_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(summary)?)?;
    Ok(())
}

pub fn load_summary(path: &Path) -> Result<Option<RunSummary>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse run summary at {}", path.display()))
        .map(Some)
}
