//! Dotted version comparison used for `since_version`/`until_version` filtering.

use std::cmp::Ordering;

/// Compares two dotted versions numerically (`1.10` > `1.9`, `1.0` == `1`).
/// Non-numeric segments compare as strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.trim().trim_start_matches('v').split('.').collect();
    let right: Vec<&str> = b.trim().trim_start_matches('v').split('.').collect();

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or("0");
        let r = right.get(i).copied().unwrap_or("0");
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            _ => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Whether `version` falls within an optional `[since, until]` range.
pub fn in_range(version: &str, since: Option<&str>, until: Option<&str>) -> bool {
    if let Some(since) = since {
        if compare(version, since) == Ordering::Less {
            return false;
        }
    }
    if let Some(until) = until {
        if compare(version, until) == Ordering::Greater {
            return false;
        }
    }
    true
}
