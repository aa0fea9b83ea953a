//! Parse → build → commit pipeline (C5).
//!
//! A bounded set of parser worker threads (degree = number of CPUs by
//! default) walk their share of the file list, build each yielded
//! `MemberRecord` into a `Document`, and push it onto a single bounded
//! `crossbeam_channel`. One writer thread drains the channel, batching
//! commits at `index::BATCH_SIZE`. The channel's own disconnect signal
//! (all worker senders dropped once `std::thread::scope` joins them) tells
//! the writer there is nothing left to drain, so no sentinel payload is
//! needed to mark end-of-stream — channel closure already carries that
//! information in idiomatic Rust.
//!
//! Cancellation is cooperative: a shared `AtomicBool` is checked between
//! parse iterations (worker side) and between drains (writer side); on
//! cancel, workers stop pulling new files and the writer commits whatever
//! it already has before returning.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::document::{build_document, build_empty_marker_document};
use crate::error::ApiLensError;
use crate::index::Index;
use crate::model::EmptyFileMarker;
use crate::parser::{QuickXmlDocParser, XmlDocParser};
use crate::paths::normalize_path;

/// Tunables for one indexing run (§5 concurrency/resource model).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of parser worker threads. `0` means "number of CPUs".
    pub worker_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig { worker_threads: 0 }
    }
}

/// Per-run counters beyond what `IndexBatchReport` tracks. There is no
/// pool/GC instrumentation here: this crate owns its memory instead of
/// pooling it, so there is nothing to report there, but batch-level timing
/// is still useful operationally.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub batch_count: usize,
    pub average_batch_commit_time: Duration,
    pub worker_threads_used: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndexingRunReport {
    pub total_documents: usize,
    pub successful_documents: usize,
    pub failed_documents: usize,
    pub elapsed_time: Duration,
    pub bytes_processed: u64,
    pub metrics: RunMetrics,
    pub errors: Vec<String>,
}

/// Parses and indexes every file in `paths`, splitting work across
/// `config.worker_threads` parser threads feeding a single writer that
/// commits into `index`.
pub fn index_xml_files(
    index: &Index,
    paths: &[String],
    config: &PipelineConfig,
    cancel: &AtomicBool,
) -> Result<IndexingRunReport, ApiLensError> {
    let start = Instant::now();

    let worker_count = if config.worker_threads == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    } else {
        config.worker_threads
    }
    .max(1)
    .min(paths.len().max(1));

    let (sender, receiver) = crossbeam_channel::bounded::<crate::document::Document>(crate::index::CHANNEL_CAPACITY);

    let errors: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let bytes_processed = AtomicU64::new(0);
    let parser = QuickXmlDocParser;

    let chunks = split_into_chunks(paths, worker_count);

    std::thread::scope(|scope| {
        for chunk in &chunks {
            let sender = sender.clone();
            let errors = &errors;
            let bytes_processed = &bytes_processed;
            let parser = &parser;
            scope.spawn(move || {
                for path in chunk {
                    if cancel.load(AtomicOrdering::Relaxed) {
                        break;
                    }

                    if let Ok(meta) = std::fs::metadata(path) {
                        bytes_processed.fetch_add(meta.len(), AtomicOrdering::Relaxed);
                    }

                    let normalized = normalize_path(path);
                    let mut record_count = 0usize;
                    let mut had_parse_error = false;

                    for result in parser.parse_file_stream(path, cancel) {
                        match result {
                            Ok(record) => {
                                record_count += 1;
                                let doc = build_document(&record);
                                if sender.send(doc).is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                had_parse_error = true;
                                errors.lock().unwrap_or_else(|e| e.into_inner()).push(e.to_string());
                            }
                        }
                    }

                    if record_count == 0 && !had_parse_error {
                        let marker = EmptyFileMarker::for_path(&normalized);
                        let doc = build_empty_marker_document(&marker);
                        if sender.send(doc).is_err() {
                            return;
                        }
                    }
                }
            });
        }
        // Drop the pipeline's own sender so the channel disconnects once
        // every worker's clone is also dropped at scope-join time.
        drop(sender);

        let mut report = IndexingRunReport::default();
        let mut since_commit = 0usize;
        let mut commit_durations: Vec<Duration> = Vec::new();

        while let Ok(doc) = receiver.recv() {
            match index.upsert(doc) {
                Ok(()) => {
                    report.successful_documents += 1;
                    since_commit += 1;
                }
                Err(e) => {
                    report.failed_documents += 1;
                    errors.lock().unwrap_or_else(|e| e.into_inner()).push(e.to_string());
                }
            }
            report.total_documents += 1;

            if since_commit >= crate::index::BATCH_SIZE || cancel.load(AtomicOrdering::Relaxed) {
                let commit_start = Instant::now();
                index.commit()?;
                commit_durations.push(commit_start.elapsed());
                since_commit = 0;
                if cancel.load(AtomicOrdering::Relaxed) {
                    break;
                }
            }
        }

        let commit_start = Instant::now();
        index.commit()?;
        commit_durations.push(commit_start.elapsed());

        report.elapsed_time = start.elapsed();
        report.bytes_processed = bytes_processed.load(AtomicOrdering::Relaxed);
        report.errors = errors.lock().unwrap_or_else(|e| e.into_inner()).clone();
        report.metrics = RunMetrics {
            batch_count: commit_durations.len(),
            average_batch_commit_time: average_duration(&commit_durations),
            worker_threads_used: worker_count,
        };

        if cancel.load(AtomicOrdering::Relaxed) {
            tracing::debug!(documents = report.total_documents, "run cancelled, committed partial state");
        }

        Ok(report)
    })
}

fn split_into_chunks(paths: &[String], worker_count: usize) -> Vec<Vec<String>> {
    let mut chunks: Vec<Vec<String>> = vec![Vec::new(); worker_count];
    for (i, path) in paths.iter().enumerate() {
        chunks[i % worker_count].push(path.clone());
    }
    chunks
}

fn average_duration(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = durations.iter().sum();
    total / durations.len() as u32
}

/// Convenience wrapper used by the binary: indexes paths discovered for one
/// directory on disk, single-file shortcut around `index_xml_files`.
pub fn index_single_file(index: &Index, path: &Path, cancel: &AtomicBool) -> Result<IndexingRunReport, ApiLensError> {
    index_xml_files(index, &[path.to_string_lossy().to_string()], &PipelineConfig::default(), cancel)
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    fn write_doc(dir: &Path, name: &str, members_xml: &str) -> String {
        let path = dir.join(name);
        let xml = format!("<doc><members>{members_xml}</members></doc>");
        std::fs::write(&path, xml).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn indexes_multiple_files_across_workers() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        let index = Index::open(&index_path).unwrap();

        let a = write_doc(dir.path(), "A.xml", r#"<member name="T:A.Widget"><summary>A.</summary></member>"#);
        let b = write_doc(dir.path(), "B.xml", r#"<member name="T:B.Widget"><summary>B.</summary></member>"#);
        let cancel = AtomicBool::new(false);

        let report = index_xml_files(&index, &[a, b], &PipelineConfig { worker_threads: 2 }, &cancel).unwrap();
        assert_eq!(report.total_documents, 2);
        assert_eq!(report.successful_documents, 2);
        assert_eq!(report.failed_documents, 0);
    }

    #[test]
    fn empty_file_produces_a_marker_document() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        let index = Index::open(&index_path).unwrap();

        let empty = write_doc(dir.path(), "Empty.xml", "");
        let cancel = AtomicBool::new(false);

        let report = index_xml_files(&index, &[empty.clone()], &PipelineConfig::default(), &cancel).unwrap();
        assert_eq!(report.total_documents, 1);

        let empty_paths = index.get_empty_xml_paths().unwrap();
        assert!(empty_paths.contains(&normalize_path(&empty)));
    }

    #[test]
    fn parse_error_is_recorded_and_does_not_abort_the_run() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        let index = Index::open(&index_path).unwrap();

        let missing = dir.path().join("missing.xml").to_string_lossy().to_string();
        let good = write_doc(dir.path(), "Good.xml", r#"<member name="T:Good.Widget"><summary>G.</summary></member>"#);
        let cancel = AtomicBool::new(false);

        let report = index_xml_files(&index, &[missing, good], &PipelineConfig::default(), &cancel).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.successful_documents >= 1);
    }

    #[test]
    fn cancellation_stops_further_parsing() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("index.bin");
        let index = Index::open(&index_path).unwrap();

        let a = write_doc(dir.path(), "A.xml", r#"<member name="T:A.Widget"><summary>A.</summary></member>"#);
        let cancel = AtomicBool::new(true);

        let report = index_xml_files(&index, &[a], &PipelineConfig::default(), &cancel).unwrap();
        assert_eq!(report.total_documents, 0);
    }
}
