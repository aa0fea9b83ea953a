//! Incremental-refresh protocol (§1.3, §2): scan → deduplicate → delete →
//! index.
//!
//! This is the orchestration that C6's design notes call for but that no
//! single component owns on its own: C7 discovers candidates, C6 consults
//! C4's current snapshot to decide what actually needs work, C4 deletes the
//! packages `latestOnly` made obsolete, and C5 parses/builds/commits the
//! survivors. Each step is a plain function call — there is nothing here
//! that the components themselves do not already provide, which is the
//! point: the refresh protocol is glue, not a ninth component.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use crate::dedup::{self, DedupStats};
use crate::error::ApiLensError;
use crate::index::Index;
use crate::pipeline::{self, IndexingRunReport, PipelineConfig};
use crate::scanner::CacheScanner;

/// Everything a caller needs to know about one refresh run: what the
/// deduplicator decided plus what the indexing pipeline actually did with
/// the files it was handed.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub dedup_stats: DedupStats,
    pub packages_deleted: usize,
    pub skipped_count: usize,
    pub run_report: IndexingRunReport,
}

/// Runs one full refresh cycle against `index` for the package cache rooted
/// at `cache_root`, using `scanner` for discovery (C7).
///
/// `latest_only` mirrors spec.md §4.6's flag: when set, only the greatest
/// version per package survives and every other version already present in
/// the index is scheduled for deletion before the survivor is written.
pub fn refresh(
    index: &Index,
    cache_root: &Path,
    scanner: &dyn CacheScanner,
    latest_only: bool,
    config: &PipelineConfig,
    cancel: &AtomicBool,
) -> Result<RefreshReport, ApiLensError> {
    let scanned = scanner.scan(cache_root);
    tracing::info!(cache_root = %cache_root.display(), found = scanned.len(), "cache scan complete");

    let snapshot = index.get_index_snapshot()?;
    let dedup_result = dedup::deduplicate(&scanned, &snapshot, latest_only);
    tracing::debug!(
        files_to_index = dedup_result.files_to_index.len(),
        packages_to_delete = dedup_result.package_ids_to_delete.len(),
        skipped = dedup_result.skipped_count,
        "dedup decision"
    );

    // Obsolete versions must be purged before the fresh one is written so a
    // stale document with the same logical identity never survives a
    // latest-only refresh (spec.md §1.3(d), §8 "Latest-only safety").
    let packages_deleted = dedup_result.package_ids_to_delete.len();
    if !dedup_result.package_ids_to_delete.is_empty() {
        index.delete_by_package_ids(&dedup_result.package_ids_to_delete)?;
        index.commit()?;
    }

    let run_report = pipeline::index_xml_files(index, &dedup_result.files_to_index, config, cancel)?;

    Ok(RefreshReport {
        dedup_stats: dedup_result.stats,
        packages_deleted,
        skipped_count: dedup_result.skipped_count,
        run_report,
    })
}
