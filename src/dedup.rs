//! Incremental deduplicator (C6): given scanned packages and the index's
//! current state, decides what to (re)index and what to purge.
//!
//! This is the component with the most corner cases (§4.6), so the
//! implementation follows the seven numbered steps directly rather than
//! optimising for a single pass — each step's intent should be recoverable
//! by reading the code next to its comment.

use std::collections::{HashMap, HashSet};

use crate::model::{IndexSnapshot, PackageEntry};
use crate::paths::normalize_path;
use crate::version::compare_versions;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub total_scanned: usize,
    pub unique_xml_files: usize,
    pub empty_xml_files_skipped: usize,
    pub already_indexed_skipped: usize,
    pub new_packages: usize,
    pub updated_packages: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    pub files_to_index: Vec<String>,
    pub package_ids_to_delete: HashSet<String>,
    pub skipped_count: usize,
    pub stats: DedupStats,
}

pub fn deduplicate(scanned: &[PackageEntry], snapshot: &IndexSnapshot, latest_only: bool) -> DedupResult {
    let mut stats = DedupStats {
        total_scanned: scanned.len(),
        ..Default::default()
    };

    // Step 1 + 2: normalise paths, drop anything already known to be empty.
    let mut survivors: Vec<&PackageEntry> = Vec::with_capacity(scanned.len());
    for entry in scanned {
        let normalized = normalize_path(&entry.xml_documentation_path);
        if snapshot
            .empty_xml_paths
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&normalized))
        {
            stats.empty_xml_files_skipped += 1;
            continue;
        }
        survivors.push(entry);
    }

    // Step 3: group by packageId, preserving first-seen group order so
    // tie-breaks ("prefer the first encountered in scan order") are stable.
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&PackageEntry>> = HashMap::new();
    for entry in &survivors {
        groups
            .entry(entry.package_id.clone())
            .or_insert_with(|| {
                group_order.push(entry.package_id.clone());
                Vec::new()
            })
            .push(entry);
    }

    let mut package_ids_to_delete: HashSet<String> = HashSet::new();
    let mut chosen: Vec<&PackageEntry> = Vec::new();

    if latest_only {
        for package_id in &group_order {
            let entries = &groups[package_id];
            let mut best = entries[0];
            for candidate in &entries[1..] {
                if compare_versions(&candidate.version, &best.version) == std::cmp::Ordering::Greater {
                    best = candidate;
                }
            }

            // Step 4: schedule a delete-by-packageId if the snapshot holds
            // any version of this package other than the chosen one.
            if let Some(existing) = snapshot.packages_by_id_with_framework.get(package_id) {
                if existing.iter().any(|(v, _)| v != &best.version) {
                    package_ids_to_delete.insert(package_id.clone());
                }
            }

            for entry in entries {
                if entry.version == best.version {
                    chosen.push(entry);
                }
            }
        }
    } else {
        chosen = survivors;
    }

    // Step 5 (framework-aware skip) + step 6 (path dedup) + step 7
    // (new/updated classification), in scan order.
    let mut seen_paths: HashSet<String> = HashSet::new();
    let mut files_to_index: Vec<String> = Vec::new();

    for entry in &chosen {
        let normalized = normalize_path(&entry.xml_documentation_path);
        let normalized_lower = normalized.to_lowercase();
        let framework = if entry.framework.is_empty() {
            "unknown".to_string()
        } else {
            entry.framework.clone()
        };

        let snapshot_versions = snapshot.packages_by_id_with_framework.get(&entry.package_id);
        let exact_version_framework_known = snapshot_versions
            .map(|set| set.contains(&(entry.version.clone(), framework.clone())))
            .unwrap_or(false);
        let path_already_indexed = snapshot
            .indexed_xml_paths
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&normalized));

        if exact_version_framework_known && path_already_indexed {
            stats.already_indexed_skipped += 1;
            continue;
        }

        match snapshot_versions {
            None => stats.new_packages += 1,
            Some(_) if !exact_version_framework_known => stats.updated_packages += 1,
            Some(_) => {}
        }

        if seen_paths.insert(normalized_lower) {
            files_to_index.push(normalized);
        }
    }

    stats.unique_xml_files = files_to_index.len();
    let skipped_count = stats.empty_xml_files_skipped + stats.already_indexed_skipped;

    DedupResult {
        files_to_index,
        package_ids_to_delete,
        skipped_count,
        stats,
    }
}
