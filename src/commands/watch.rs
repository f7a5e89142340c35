use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::archiver::config::{load_config, unknown_env_keys};
use crate::archiver::pdf::HttpFetcher;
use crate::archiver::watcher;
use crate::linkding::LinkdingClient;

#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    pub dry_run: bool,
    pub single_run: bool,
}

fn install_interrupt_cleanup(temp_root: PathBuf) -> Result<()> {
    ctrlc::set_handler(move || {
        info!(temp_root = %temp_root.display(), "interrupted, removing temp storage");
        let _ = fs::remove_dir_all(&temp_root);
        std::process::exit(1);
    })
    .context("failed to install interrupt handler")
}

fn warn_unknown_env() {
    for key in unknown_env_keys(env::vars_os().map(|(k, _)| k)) {
        warn!(key = %key, "ignoring unrecognised environment variable");
    }
}

/// Wire up the client, fetcher and temp storage, then hand over to the scan
/// loop. Only returns in single-run mode or on a startup failure.
pub fn run(opts: &WatchOptions) -> Result<()> {
    let cfg = load_config()?;
    warn_unknown_env();

    let client = LinkdingClient::new(&cfg.base_url, &cfg.token)?;
    let temp_root = tempfile::Builder::new()
        .prefix("pdfs")
        .tempdir()
        .context("failed to create temp storage")?;
    install_interrupt_cleanup(temp_root.path().to_path_buf())?;
    let fetcher = HttpFetcher::new(temp_root.path())?;

    info!(
        base_url = %client.base_url(),
        tags = ?cfg.tags,
        bundle_id = cfg.bundle_id,
        scan_interval_secs = cfg.scan_interval_secs,
        max_concurrency = cfg.max_concurrency,
        dry_run = opts.dry_run,
        single_run = opts.single_run,
        temp_root = %temp_root.path().display(),
        "starting linkding pdf archiver"
    );

    watcher::run_loop(&client, &fetcher, &cfg, opts.dry_run, opts.single_run);

    temp_root
        .close()
        .context("failed to remove temp storage")
}
