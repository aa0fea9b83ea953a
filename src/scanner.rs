//! Cache scanner (C7): walks a NuGet-style package cache and projects every
//! XML documentation file it finds into a `PackageEntry`.
//!
//! The parallel walk is grounded on the host crate's `build_index` in
//! `index.rs`: an `ignore::WalkBuilder` run in parallel, each worker closure
//! pushing into a shared `Mutex`-guarded `Vec`.

use std::path::Path;
use std::sync::Mutex;

use ignore::WalkBuilder;

use crate::model::PackageEntry;
use crate::paths::packaging_context_from_path;
use crate::version::compare_versions;

/// Abstracts package-cache discovery so the pipeline and tests can swap in a
/// fake scanner without touching a real filesystem.
pub trait CacheScanner {
    fn scan(&self, cache_root: &Path) -> Vec<PackageEntry>;
}

pub struct FileSystemCacheScanner {
    pub hidden: bool,
    pub follow_ignore_files: bool,
    pub threads: usize,
}

impl Default for FileSystemCacheScanner {
    fn default() -> Self {
        FileSystemCacheScanner {
            hidden: true,
            follow_ignore_files: false,
            threads: 0,
        }
    }
}

impl CacheScanner for FileSystemCacheScanner {
    fn scan(&self, cache_root: &Path) -> Vec<PackageEntry> {
        let mut builder = WalkBuilder::new(cache_root);
        builder.hidden(!self.hidden);
        builder.git_ignore(self.follow_ignore_files);
        builder.git_global(self.follow_ignore_files);
        builder.git_exclude(self.follow_ignore_files);

        let thread_count = if self.threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            self.threads
        };
        builder.threads(thread_count);

        let cache_root_str = cache_root.to_string_lossy().to_string();
        let entries: Mutex<Vec<PackageEntry>> = Mutex::new(Vec::new());

        builder.build_parallel().run(|| {
            let entries = &entries;
            let cache_root_str = cache_root_str.clone();
            Box::new(move |result| {
                if let Ok(dir_entry) = result {
                    let is_file = dir_entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                    if is_file {
                        let path = dir_entry.path().to_string_lossy().to_string();
                        if path.to_lowercase().ends_with(".xml") {
                            if let Some(entry) = packaging_context_from_path(&path, &cache_root_str) {
                                entries.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
                            }
                        }
                    }
                }
                ignore::WalkState::Continue
            })
        });

        entries.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

/// Retains, per distinct `(packageId, framework)` pair, only the
/// greatest-version entry, preserving first-seen order among the survivors.
pub fn latest_versions_only(entries: &[PackageEntry]) -> Vec<PackageEntry> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut best: std::collections::HashMap<(String, String), PackageEntry> = std::collections::HashMap::new();

    for entry in entries {
        let key = (entry.package_id.to_lowercase(), entry.framework.to_lowercase());
        match best.get(&key) {
            None => {
                order.push(key.clone());
                best.insert(key, entry.clone());
            }
            Some(current) => {
                if compare_versions(&entry.version, &current.version) == std::cmp::Ordering::Greater {
                    best.insert(key, entry.clone());
                }
            }
        }
    }

    order.into_iter().filter_map(|key| best.remove(&key)).collect()
}
