use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: Url,
    /// Download endpoint template; `{id}` is replaced with the manifest id.
    #[serde(default = "default_download_url")]
    pub download_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            upload_url: default_upload_url(),
            download_url: default_download_url(),
        }
    }
}

/// Resolved configuration, built once at startup from the config file and
/// environment overrides. CLI flags are applied on top by the command
/// handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory whose files are encrypted.
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    /// Where manifest CSVs are written before upload
    /// (default: `manifests` under the current directory).
    #[serde(default)]
    pub manifest_dir: Option<PathBuf>,
    /// Glob patterns (relative to the target directory) a file must match
    /// to be eligible for encryption.
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Glob patterns that exclude otherwise eligible files.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Manifest identifier used by `decrypt` when no flag is given.
    #[serde(default)]
    pub manifest_id: Option<String>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Overrides the run summary location
    /// (default: `pazuzu/last_run.json` in the system data dir).
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: None,
            manifest_dir: None,
            include: default_include(),
            exclude: Vec::new(),
            manifest_id: None,
            provider: ProviderConfig::default(),
            log_filter: default_log_filter(),
            state_path: None,
        }
    }
}

fn default_provider_name() -> String {
    "pixeldrain".into()
}

fn default_upload_url() -> Url {
    "https://pixeldrain.com/api/file".parse().unwrap()
}

fn default_download_url() -> String {
    "https://pixeldrain.com/api/file/{id}".into()
}

fn default_include() -> Vec<String> {
    vec!["**/*".into()]
}

fn default_log_filter() -> String {
    "info".into()
}

impl Config {
    /// Loads the configuration file (explicit path, `PAZUZU_CONFIG`, or the
    /// default location if it exists) and applies environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => env::var_os("PAZUZU_CONFIG")
                .map(PathBuf::from)
                .or_else(|| default_config_file().filter(|path| path.exists())),
        };
        let mut config = match &file {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                json5::from_str(&content)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env::var_os("PAZUZU_ROOT_DIR") {
            self.root_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = env::var_os("PAZUZU_MANIFEST_DIR") {
            self.manifest_dir = Some(PathBuf::from(value));
        }
        if let Ok(value) = env::var("PAZUZU_PROVIDER") {
            self.provider.name = value;
        }
        if let Ok(value) = env::var("PAZUZU_MANIFEST_ID") {
            self.manifest_id = Some(value);
        }
        if let Ok(value) = env::var("PAZUZU_LOG") {
            self.log_filter = value;
        }
    }
}

pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pazuzu.json5"))
}
