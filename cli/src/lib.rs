pub mod cli;
pub mod config;
pub mod counters;
pub mod decrypt;
pub mod encrypt;
pub mod info;
pub mod rules;
pub mod scanner;
pub mod state;

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Utc;
use pazuzu_sdk::provider::Provider;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

use crate::{
    cli::{Cli, Command},
    config::Config,
    rules::Rules,
    state::RunSummary,
};

/// Everything the command handlers need: the resolved configuration and the
/// selected storage provider.
pub struct Ctx {
    pub config: Config,
    pub provider: Provider,
}

/// Installs the tracing subscriber. `RUST_LOG` wins over the configured
/// filter.
pub fn setup_logger(log_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    Ok(())
}

/// Runs one CLI command to completion.
///
/// Returns `Err` only for setup problems (bad config, unknown provider,
/// invalid target) and provider transport failures. Per-file trouble is
/// reported through the run statistics and does not fail the process.
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Encrypt {
            path,
            manifest,
            provider,
            dry_run,
        } => {
            let ctx = build_ctx(config, provider)?;
            run_encrypt(&ctx, path, manifest, dry_run).await
        }
        Command::Decrypt {
            manifest_id,
            manifest,
            provider,
            dry_run,
        } => {
            let ctx = build_ctx(config, provider)?;
            run_decrypt(&ctx, manifest_id, manifest, dry_run).await
        }
        Command::Status { manifest } => info::status(&config, manifest),
    }
}

fn build_ctx(mut config: Config, provider_override: Option<String>) -> Result<Ctx> {
    if let Some(name) = provider_override {
        config.provider.name = name;
    }
    let provider = Provider::from_name(
        &config.provider.name,
        &config.provider.upload_url,
        &config.provider.download_url,
    )?;
    Ok(Ctx { config, provider })
}

async fn run_encrypt(
    ctx: &Ctx,
    path: Option<PathBuf>,
    manifest: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let Some(root) = path.or_else(|| ctx.config.root_dir.clone()) else {
        bail!("target directory is not configured; pass --path or set `root_dir` in the config");
    };
    let root = fs_err::canonicalize(&root)
        .map_err(|err| anyhow::anyhow!("invalid target directory {}: {err}", root.display()))?;
    let manifest_path = match manifest {
        Some(path) => path,
        None => default_manifest_path(&ctx.config)?,
    };
    let rules = Rules::new(&ctx.config.include, &ctx.config.exclude, root.clone())?;

    let scan = scanner::scan(&root, &rules, Some(&manifest_path))?;
    info!("target: {}", root.display());
    info!("provider: {}", ctx.provider.name());
    info!(
        "found {} files in {} directories ({})",
        scan.files.len(),
        scan.dir_count,
        info::pretty_size(scan.total_bytes)
    );
    if scan.files.is_empty() {
        info!("no eligible files found");
        return Ok(());
    }
    if dry_run {
        info!("dry run: nothing will be modified");
    }

    let outcome = encrypt::encrypt_directory(
        &ctx.provider,
        &rules,
        &root,
        &manifest_path,
        dry_run,
        Some(scan.files),
    )
    .await?;

    let summary = RunSummary {
        operation: "encrypt".into(),
        timestamp: Utc::now(),
        provider: ctx.provider.name().to_owned(),
        dry_run,
        files: outcome.stats.encrypted,
        skipped: outcome.stats.skipped,
        failed: outcome.stats.failed,
        bytes: outcome.stats.bytes,
        destination: outcome
            .upload
            .as_ref()
            .map(|upload| upload.destination.clone()),
        manifest_id: outcome
            .upload
            .as_ref()
            .and_then(|upload| upload.metadata.get("id").cloned()),
        manifest_path: (!dry_run && outcome.stats.encrypted > 0)
            .then(|| outcome.manifest_path.clone()),
    };
    persist_summary(&ctx.config, &summary);

    if let Some(upload) = &outcome.upload {
        info!("manifest destination: {}", upload.destination);
        if let Some(id) = upload.metadata.get("id") {
            info!("manifest id: {id}");
        }
    }
    Ok(())
}

async fn run_decrypt(
    ctx: &Ctx,
    manifest_id: Option<String>,
    manifest: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let identifier = resolve_manifest_identifier(ctx, manifest_id, manifest)?;
    info!("provider: {}", ctx.provider.name());
    if dry_run {
        info!("dry run: nothing will be modified");
    }

    let stats = decrypt::decrypt_from_manifest(&ctx.provider, &identifier, dry_run).await?;

    let summary = RunSummary {
        operation: "decrypt".into(),
        timestamp: Utc::now(),
        provider: ctx.provider.name().to_owned(),
        dry_run,
        files: stats.restored,
        skipped: stats.skipped,
        failed: stats.failed,
        bytes: stats.bytes,
        destination: None,
        manifest_id: Some(identifier),
        manifest_path: None,
    };
    persist_summary(&ctx.config, &summary);
    Ok(())
}

fn resolve_manifest_identifier(
    ctx: &Ctx,
    manifest_id: Option<String>,
    manifest: Option<PathBuf>,
) -> Result<String> {
    if let Some(path) = manifest {
        // The local provider's identifier is a filesystem path.
        return Ok(path.display().to_string());
    }
    if let Some(id) = manifest_id {
        return Ok(id);
    }
    if let Some(id) = &ctx.config.manifest_id {
        return Ok(id.clone());
    }
    bail!(
        "manifest identifier is missing; pass --manifest-id (or --manifest for the \
        local provider), or set `manifest_id` in the config"
    )
}

fn default_manifest_path(config: &Config) -> Result<PathBuf> {
    let dir = match &config.manifest_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?.join("manifests"),
    };
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    Ok(dir.join(format!("pazuzu-manifest-{stamp}.csv")))
}

fn persist_summary(config: &Config, summary: &RunSummary) {
    let result =
        state::state_file_path(config).and_then(|path| state::save_summary(&path, summary));
    if let Err(err) = result {
        warn!("failed to save run summary: {err:#}");
    }
}
