//! Numeric version comparison and status classification

use std::cmp::Ordering;
use std::fmt;

/// Classification of an installed version against the latest known release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus {
    /// Installed version is at least the latest release.
    Current,
    /// A newer release exists upstream.
    Outdated,
    /// The component is not installed.
    NotInstalled,
    /// Installed, but no comparable latest version is available.
    Unknown,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Outdated => "outdated",
            Self::NotInstalled => "not_installed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an installed version against the latest release.
///
/// Versions are compared as sequences of digit runs ("1.10.0" is newer than
/// "1.2.0"); a shorter sequence is padded with trailing zeros, so "1.2" and
/// "1.2.0" are equal. A version with no digits at all cannot be compared and
/// degrades to [`VersionStatus::Unknown`].
pub fn classify(installed: Option<&str>, latest: Option<&str>) -> VersionStatus {
    let Some(installed) = installed.filter(|v| !v.is_empty()) else {
        return VersionStatus::NotInstalled;
    };
    let Some(latest) = latest.filter(|v| !v.is_empty()) else {
        return VersionStatus::Unknown;
    };

    let (Some(installed), Some(latest)) = (numeric_parts(installed), numeric_parts(latest))
    else {
        return VersionStatus::Unknown;
    };

    match compare_parts(&installed, &latest) {
        Ordering::Less => VersionStatus::Outdated,
        Ordering::Equal | Ordering::Greater => VersionStatus::Current,
    }
}

/// Extract all runs of digits as integers: "3.4.1" -> [3, 4, 1],
/// "16beta2" -> [16, 2]. Returns None when the string contains no digits or
/// a run overflows.
fn numeric_parts(version: &str) -> Option<Vec<u64>> {
    let parts: Option<Vec<u64>> = version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse::<u64>().ok())
        .collect();
    parts.filter(|p| !p.is_empty())
}

/// Component-wise comparison, missing trailing components treated as zero.
fn compare_parts(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
