use crate::archiver::pdf::{DocumentFetcher, DownloadedDocument, is_pdf_url};
use crate::linkding::mimetypes::{file_extension, mime_type_for};
use crate::linkding::{ASSET_TYPE_UPLOAD, Asset, Bookmark, BookmarkService, BookmarksQuery};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
/// Identifier carried by assets fabricated in dry-run mode.
pub const SIMULATED_ASSET_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfiguration {
    /// Empty means every bookmark, regardless of tags.
    pub tags: Vec<String>,
    /// Zero means no bundle filter.
    pub bundle_id: u64,
    pub dry_run: bool,
    pub last_scan: Option<DateTime<Utc>>,
    pub max_concurrency: usize,
}

impl Default for JobConfiguration {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            bundle_id: 0,
            dry_run: false,
            last_scan: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub candidates: usize,
    pub skipped: usize,
    pub already_archived: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Succeeded,
    Failed,
}

/// Query once per tag and merge the results, keeping the first occurrence of
/// each bookmark id. Any failed query fails the whole listing.
pub fn collect_bookmarks(
    service: &dyn BookmarkService,
    config: &JobConfiguration,
) -> Result<Vec<Bookmark>> {
    let tags = if config.tags.is_empty() {
        vec![String::new()]
    } else {
        config.tags.clone()
    };

    let mut seen = HashSet::new();
    let mut bookmarks = Vec::new();
    for tag in tags {
        let query = BookmarksQuery {
            tag,
            bundle_id: config.bundle_id,
            modified_since: config.last_scan,
        };
        let found = service.list_bookmarks(&query)?;
        for bookmark in found {
            if seen.insert(bookmark.id) {
                bookmarks.push(bookmark);
            }
        }
    }

    Ok(bookmarks)
}

fn simulated_asset(file_name: &str) -> Result<Asset> {
    let content_type = mime_type_for(file_name)?;
    Ok(Asset {
        id: SIMULATED_ASSET_ID,
        asset_type: ASSET_TYPE_UPLOAD.to_string(),
        content_type: content_type.to_string(),
        display_name: format!(
            "Simulated Asset{}",
            file_extension(file_name).unwrap_or_default()
        ),
    })
}

/// Attach `document` to the bookmark, or fabricate the asset when `dry_run`.
pub fn upload_document(
    service: &dyn BookmarkService,
    bookmark_id: i64,
    document: &DownloadedDocument,
    dry_run: bool,
) -> Result<Asset> {
    let file = document
        .open()
        .with_context(|| format!("failed to open {}", document.path().display()))?;
    let file_name = document.file_name();

    if dry_run {
        return simulated_asset(&file_name);
    }
    service.add_asset(bookmark_id, file, &file_name)
}

/// Download then upload one bookmark. The download directory is gone by the
/// time this returns, whatever the result.
fn archive_bookmark(
    service: &dyn BookmarkService,
    fetcher: &dyn DocumentFetcher,
    bookmark: &Bookmark,
    dry_run: bool,
) -> Result<Asset> {
    info!(bookmark_id = bookmark.id, url = %bookmark.url, "downloading PDF");
    let document = match fetcher.download(&bookmark.url) {
        Ok(document) => document,
        Err(err) => {
            let reason = format!("{err:#}");
            error!(bookmark_id = bookmark.id, url = %bookmark.url, error = %reason, "failed to download PDF");
            return Err(err);
        }
    };
    let path = document.path().display().to_string();
    info!(bookmark_id = bookmark.id, path = %path, "PDF downloaded successfully");

    info!(bookmark_id = bookmark.id, dry_run, path = %path, "adding asset");
    let uploaded = upload_document(service, bookmark.id, &document, dry_run);
    let dir = document.dir().display().to_string();
    drop(document);
    debug!(bookmark_id = bookmark.id, dir = %dir, "removed download dir");

    match uploaded {
        Ok(asset) => {
            info!(bookmark_id = bookmark.id, dry_run, path = %path, asset_id = asset.id, "asset added successfully");
            Ok(asset)
        }
        Err(err) => {
            let reason = format!("{err:#}");
            error!(bookmark_id = bookmark.id, dry_run, path = %path, error = %reason, "failed to add asset");
            Err(err)
        }
    }
}

/// Run every queued bookmark on at most `max_concurrency` worker threads and
/// count the outcomes reported back over a channel.
fn run_units(
    service: &dyn BookmarkService,
    fetcher: &dyn DocumentFetcher,
    queue: &[&Bookmark],
    dry_run: bool,
    max_concurrency: usize,
) -> (usize, usize) {
    if queue.is_empty() {
        return (0, 0);
    }

    let workers = max_concurrency.clamp(1, queue.len());
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(i64, UnitOutcome)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(bookmark) = queue.get(idx) else {
                        break;
                    };
                    let outcome = match archive_bookmark(service, fetcher, bookmark, dry_run) {
                        Ok(_) => UnitOutcome::Succeeded,
                        Err(_) => UnitOutcome::Failed,
                    };
                    if tx.send((bookmark.id, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for (bookmark_id, outcome) in rx {
        debug!(bookmark_id, ?outcome, "unit finished");
        match outcome {
            UnitOutcome::Succeeded => succeeded += 1,
            UnitOutcome::Failed => failed += 1,
        }
    }
    (succeeded, failed)
}

/// One full scan. Only a failed listing is an error; per-bookmark failures
/// are logged and counted in the returned summary.
pub fn process_bookmarks(
    service: &dyn BookmarkService,
    fetcher: &dyn DocumentFetcher,
    config: &JobConfiguration,
) -> Result<ScanSummary> {
    let bookmarks = collect_bookmarks(service, config)?;
    let mut summary = ScanSummary {
        candidates: bookmarks.len(),
        ..ScanSummary::default()
    };

    if bookmarks.is_empty() {
        info!(tags = ?config.tags, bundle_id = config.bundle_id, dry_run = config.dry_run, "no bookmarks to process");
        return Ok(summary);
    }
    info!(
        tags = ?config.tags,
        bundle_id = config.bundle_id,
        dry_run = config.dry_run,
        count = bookmarks.len(),
        "processing bookmarks"
    );

    let mut queue = Vec::new();
    for bookmark in &bookmarks {
        if !is_pdf_url(&bookmark.url) {
            debug!(bookmark_id = bookmark.id, url = %bookmark.url, tags = ?bookmark.tag_names, "skipping non-PDF URL");
            summary.skipped += 1;
            continue;
        }

        let assets = match service.list_assets(bookmark.id) {
            Ok(assets) => assets,
            Err(err) => {
                let reason = format!("{err:#}");
                error!(bookmark_id = bookmark.id, error = %reason, "failed to fetch bookmark assets");
                summary.failed += 1;
                continue;
            }
        };
        if let Some(existing) = assets.iter().find(|a| a.is_archived_document()) {
            info!(
                bookmark_id = bookmark.id,
                asset_id = existing.id,
                asset_name = %existing.display_name,
                "PDF asset already exists"
            );
            summary.already_archived += 1;
            continue;
        }

        queue.push(bookmark);
    }

    let (succeeded, failed) = run_units(
        service,
        fetcher,
        &queue,
        config.dry_run,
        config.max_concurrency,
    );
    summary.succeeded += succeeded;
    summary.failed += failed;

    info!(
        tags = ?config.tags,
        bundle_id = config.bundle_id,
        dry_run = config.dry_run,
        candidates = summary.candidates,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        already_archived = summary.already_archived,
        "done processing bookmarks"
    );
    Ok(summary)
}
