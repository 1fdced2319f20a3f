//! Version ordering.
//!
//! Versions are split on `.`; the shorter one is padded with `0`
//! components. Two numeric components compare numerically, anything else
//! lexically, so `0rc2 > 0rc1` and `1.2 == 1.2.0`. Ties are broken by the
//! release up to its first dot, compared lexically.
//!
//! A package without a declared version is satisfied by any version and
//! compares equal to everything with the same name.

use crate::types::Package;
use std::cmp::Ordering;

/// Compare two dotted version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();
    let len = left.len().max(right.len());

    (0..len)
        .map(|i| {
            let x = left.get(i).copied().unwrap_or("0");
            let y = right.get(i).copied().unwrap_or("0");
            compare_component(x, y)
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_component(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Compare two releases by their leading dot-separated segment.
pub fn compare_releases(a: &str, b: &str) -> Ordering {
    let head = |s: &str| s.split('.').next().unwrap_or_default().to_string();
    head(a).cmp(&head(b))
}

impl PartialOrd for Package {
    /// `None` for packages with different names.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.name != other.name {
            return None;
        }

        let (Some(v1), Some(v2)) = (&self.version, &other.version) else {
            return Some(Ordering::Equal);
        };

        let ord = compare_versions(v1, v2).then_with(|| {
            compare_releases(
                self.release.as_deref().unwrap_or_default(),
                other.release.as_deref().unwrap_or_default(),
            )
        });
        Some(ord)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}
