use crate::archiver::config::ArchiverConfig;
use crate::archiver::job::{JobConfiguration, ScanSummary, process_bookmarks};
use crate::archiver::pdf::DocumentFetcher;
use crate::linkding::BookmarkService;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::thread;
use std::time::Instant;
use tracing::{error, info};

/// Start of the last scan that completed without a listing error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark(Option<DateTime<Utc>>);

impl Watermark {
    pub fn get(self) -> Option<DateTime<Utc>> {
        self.0
    }
}

/// Run one scan with the current watermark, advancing it to this scan's
/// start time only when the scan succeeds.
pub fn run_scan(
    service: &dyn BookmarkService,
    fetcher: &dyn DocumentFetcher,
    cfg: &ArchiverConfig,
    dry_run: bool,
    watermark: &mut Watermark,
) -> Result<ScanSummary> {
    let started_at = Utc::now();
    let job = JobConfiguration {
        tags: cfg.tags.clone(),
        bundle_id: cfg.bundle_id,
        dry_run,
        last_scan: watermark.get(),
        max_concurrency: cfg.max_concurrency,
    };

    let summary = process_bookmarks(service, fetcher, &job)?;
    *watermark = Watermark(Some(started_at));
    Ok(summary)
}

/// Scan immediately, then once per interval. Returns after the first scan
/// when `single_run` is set; otherwise never returns.
pub fn run_loop(
    service: &dyn BookmarkService,
    fetcher: &dyn DocumentFetcher,
    cfg: &ArchiverConfig,
    dry_run: bool,
    single_run: bool,
) {
    let mut watermark = Watermark::default();
    loop {
        let tick = Instant::now();
        if let Err(err) = run_scan(service, fetcher, cfg, dry_run, &mut watermark) {
            let reason = format!("{err:#}");
            error!(error = %reason, "error processing bookmarks");
        }

        if single_run {
            return;
        }

        info!(scan_interval_secs = cfg.scan_interval_secs, "waiting for next scan");
        thread::sleep(cfg.scan_interval().saturating_sub(tick.elapsed()));
    }
}
