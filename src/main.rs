//! Thin binary driver: wires the cache scanner, deduplicator, and indexing
//! pipeline together for a single manual refresh run.
//!
//! The CLI surface itself — subcommand ergonomics, help text, output
//! renderers — is out of scope for this crate; this binary exists only so
//! the library is exercisable end to end from the command line, not as a
//! product surface in its own right.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use mimalloc::MiMalloc;

use apilens::index::Index;
use apilens::pipeline::PipelineConfig;
use apilens::refresh::refresh;
use apilens::scanner::FileSystemCacheScanner;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Refreshes an ApiLens index from a local NuGet-style package cache.
#[derive(Parser, Debug)]
#[command(name = "apilens", version, about)]
struct Args {
    /// Path to the on-disk index file.
    #[arg(short, long)]
    index: PathBuf,

    /// Root of the package cache to scan for XML documentation.
    #[arg(short, long)]
    cache: PathBuf,

    /// Keep only the latest version of each package, purging older ones.
    #[arg(long)]
    latest_only: bool,

    /// Number of parser worker threads (0 = number of CPUs).
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let index = match Index::open(args.index.clone()) {
        Ok(index) => index,
        Err(e) => {
            tracing::error!(error = %e, "failed to open index");
            std::process::exit(1);
        }
    };

    let scanner = FileSystemCacheScanner::default();
    let config = PipelineConfig {
        worker_threads: args.threads,
    };
    let cancel = AtomicBool::new(false);

    match refresh(&index, &args.cache, &scanner, args.latest_only, &config, &cancel) {
        Ok(report) => {
            tracing::info!(
                total_scanned = report.dedup_stats.total_scanned,
                unique_xml_files = report.dedup_stats.unique_xml_files,
                skipped = report.skipped_count,
                packages_deleted = report.packages_deleted,
                documents_indexed = report.run_report.successful_documents,
                documents_failed = report.run_report.failed_documents,
                elapsed_ms = report.run_report.elapsed_time.as_millis() as u64,
                "refresh complete"
            );
            if let Err(e) = index.close() {
                tracing::error!(error = %e, "failed to close index");
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "refresh failed");
            std::process::exit(1);
        }
    }
}
