//! Version comparator (C8): a total order over framework monikers and over
//! package versions, used by the deduplicator (C6) to choose "latest".

use std::cmp::Ordering;

/// Framework bucket rank: higher is newer. `net{N}.0` outranks
/// `netcoreapp{N}.M`, which outranks `netstandard{N}.M`, which outranks
/// every other moniker (§4.8 rule 1).
fn framework_rank_key(raw: &str) -> (u8, u32, u32, String) {
    let s = raw.to_lowercase();
    if let Some(n) = parse_net_n(&s) {
        return (3, n, 0, String::new());
    }
    if let Some((major, minor)) = parse_dotted_suffix(&s, "netcoreapp") {
        return (2, major, minor, String::new());
    }
    if let Some((major, minor)) = parse_dotted_suffix(&s, "netstandard") {
        return (1, major, minor, String::new());
    }
    (0, 0, 0, s)
}

fn parse_net_n(s: &str) -> Option<u32> {
    let rest = s.strip_prefix("net")?;
    let (major, minor) = rest.split_once('.')?;
    if minor != "0" {
        return None;
    }
    major.parse::<u32>().ok()
}

fn parse_dotted_suffix(s: &str, prefix: &str) -> Option<(u32, u32)> {
    let rest = s.strip_prefix(prefix)?;
    let (major, minor) = rest.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Compares two framework monikers. `Greater` means `a` is newer than `b`.
pub fn compare_frameworks(a: &str, b: &str) -> Ordering {
    framework_rank_key(a).cmp(&framework_rank_key(b))
}

/// `None` sorts after (is older than) any defined framework (§4.8 rule 3).
pub fn compare_frameworks_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_frameworks(a, b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Compares two version strings. Numeric-prefix segments compare
/// numerically; a version with no pre-release suffix sorts greater than one
/// with a pre-release suffix of the same numeric prefix (§4.8 rule 2).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_nums, a_pre) = split_version(a);
    let (b_nums, b_pre) = split_version(b);

    let numeric_cmp = compare_segments(&a_nums, &b_nums);
    if numeric_cmp != Ordering::Equal {
        return numeric_cmp;
    }

    match (a_pre.is_empty(), b_pre.is_empty()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
        (false, false) => compare_segments(&a_pre, &b_pre),
    }
}

/// `None` sorts after (is older than) any defined version.
pub fn compare_versions_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_versions(a, b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn split_version(v: &str) -> (Vec<String>, Vec<String>) {
    let (numeric_part, pre_part) = match v.split_once('-') {
        Some((n, p)) => (n, p),
        None => (v, ""),
    };
    let nums = numeric_part.split('.').map(str::to_string).collect();
    let pres = if pre_part.is_empty() {
        Vec::new()
    } else {
        pre_part.split(['.', '-']).map(str::to_string).collect()
    };
    (nums, pres)
}

fn compare_segments(a: &[String], b: &[String]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let av = a.get(i).map(String::as_str).unwrap_or("0");
        let bv = b.get(i).map(String::as_str).unwrap_or("0");
        let cmp = match (av.parse::<u64>(), bv.parse::<u64>()) {
            (Ok(an), Ok(bn)) => an.cmp(&bn),
            _ => av.cmp(bv),
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod version_tests {
    use super::*;

    #[test]
    fn net_n_newer_than_netcoreapp() {
        assert_eq!(compare_frameworks("net6.0", "netcoreapp3.1"), Ordering::Greater);
    }

    #[test]
    fn net_n_compares_numerically_not_lexicographically() {
        assert_eq!(compare_frameworks("net9.0", "net10.0"), Ordering::Less);
    }

    #[test]
    fn netcoreapp_newer_than_netstandard() {
        assert_eq!(compare_frameworks("netcoreapp2.0", "netstandard2.1"), Ordering::Greater);
    }

    #[test]
    fn netstandard_newer_than_other() {
        assert_eq!(compare_frameworks("netstandard1.0", "xamarin.ios"), Ordering::Greater);
    }

    #[test]
    fn framework_comparison_is_case_insensitive() {
        assert_eq!(compare_frameworks("NET6.0", "net6.0"), Ordering::Equal);
    }

    #[test]
    fn none_framework_sorts_after_defined() {
        assert_eq!(compare_frameworks_opt(Some("net6.0"), None), Ordering::Greater);
        assert_eq!(compare_frameworks_opt(None, Some("net6.0")), Ordering::Less);
    }

    #[test]
    fn release_outranks_prerelease_of_same_prefix() {
        assert_eq!(compare_versions("2.0.0", "2.0.0-preview.1"), Ordering::Greater);
    }

    #[test]
    fn prerelease_vs_older_stable() {
        // Scenario 4.
        assert_eq!(compare_versions("2.0.0-preview.1", "1.0.0"), Ordering::Greater);
    }

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(compare_versions("1.9.0", "1.10.0"), Ordering::Less);
    }

    #[test]
    fn prerelease_segments_compare_lexicographically_when_non_numeric() {
        assert_eq!(compare_versions("1.0.0-alpha", "1.0.0-beta"), Ordering::Less);
    }

    #[test]
    fn equal_versions_are_equal() {
        assert_eq!(compare_versions("1.2.3", "1.2.3"), Ordering::Equal);
    }

    #[test]
    fn none_version_sorts_after_defined() {
        assert_eq!(compare_versions_opt(Some("1.0.0"), None), Ordering::Greater);
    }
}
