use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Cli {
    /// Path to the configuration file
    /// (default: `pazuzu.json5` in the system config dir).
    #[clap(long)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Encrypt every eligible file under the target directory and store the
    /// key manifest with the configured provider.
    Encrypt {
        /// Target directory (overrides `root_dir` from the config).
        #[clap(long, short)]
        path: Option<PathBuf>,
        /// Exact path for the manifest CSV
        /// (default: a timestamped file in `manifest_dir`).
        #[clap(long, short)]
        manifest: Option<PathBuf>,
        /// Manifest storage provider (pixeldrain, local).
        #[clap(long)]
        provider: Option<String>,
        /// Report what would happen without touching the filesystem
        /// or the network.
        #[clap(long)]
        dry_run: bool,
    },
    /// Restore the files recorded in a previously stored manifest.
    Decrypt {
        /// Manifest identifier on the remote provider.
        #[clap(long)]
        manifest_id: Option<String>,
        /// Path to a local manifest CSV (for the local provider).
        #[clap(long, short)]
        manifest: Option<PathBuf>,
        /// Manifest storage provider (pixeldrain, local).
        #[clap(long)]
        provider: Option<String>,
        /// Report what would be restored without writing anything.
        #[clap(long)]
        dry_run: bool,
    },
    /// Show the last run summary and inspect a local manifest.
    Status {
        /// Path to a local manifest CSV to inspect.
        #[clap(long, short)]
        manifest: Option<PathBuf>,
    },
}
