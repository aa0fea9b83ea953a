//! Path normalisation and the path → packaging-context projection (§6.2).
//!
//! `normalize_path` mirrors the host crate's `clean_path` in spirit (both
//! exist to make Windows- and Unix-style paths comparable) but does the
//! opposite direction of work: the host strips a `\\?\` long-path prefix,
//! while ApiLens's paths come from a package cache that may mix separators
//! and simply need every backslash folded to a forward slash.

use crate::model::PackageEntry;

/// Converts every backslash to a forward slash. Case is preserved; callers
/// doing a path comparison should additionally lower-case both sides, since
/// path comparison is case-insensitive per §3.2.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Two normalised paths compare equal per the case-insensitive rule in §3.2.
pub fn paths_equal(a: &str, b: &str) -> bool {
    normalize_path(a).eq_ignore_ascii_case(&normalize_path(b))
}

/// Projects a path matching
/// `<cacheRoot>/<packageId>/<version>/(lib|ref)/<framework>/<assemblyName>.xml`
/// into its packaging context. Returns `None` when the path does not match
/// this shape (§6.2). Separator-insensitive: both `/` and `\` are accepted.
pub fn packaging_context_from_path(path: &str, cache_root: &str) -> Option<PackageEntry> {
    let normalized = normalize_path(path);
    let normalized_root = normalize_path(cache_root);
    let root_trimmed = normalized_root.trim_end_matches('/');

    let rel = if root_trimmed.is_empty() {
        normalized.trim_start_matches('/')
    } else {
        let lower_path = normalized.to_lowercase();
        let lower_root = root_trimmed.to_lowercase();
        if !lower_path.starts_with(&lower_root) {
            return None;
        }
        normalized[root_trimmed.len()..].trim_start_matches('/')
    };

    let components: Vec<&str> = rel.split('/').filter(|c| !c.is_empty()).collect();
    if components.len() != 5 {
        return None;
    }
    let package_id = components[0];
    let version = components[1];
    let lib_or_ref = components[2].to_lowercase();
    if lib_or_ref != "lib" && lib_or_ref != "ref" {
        return None;
    }
    let framework = components[3];
    let file_name = components[4];
    if !file_name.to_lowercase().ends_with(".xml") {
        return None;
    }

    Some(PackageEntry {
        package_id: package_id.to_string(),
        version: version.to_string(),
        framework: framework.to_string(),
        xml_documentation_path: normalized,
        content_hash: None,
    })
}
