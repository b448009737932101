//! Release tag normalization

use crate::catalog::TagPattern;

/// Normalize a raw release tag into a comparable version string.
///
/// Upstream projects tag releases in several shapes: `v2.0.0`,
/// `REL_16_2`, `ver_1.5.2`, `3.4.1`. Normalization reduces them all to a
/// bare dotted version:
///
/// 1. If `pattern` is given, replace the tag with its single captured group;
///    a non-matching pattern means no usable version.
/// 2. Strip a leading `REL_`/`REL-` or `VER_`/`VER-` marker (case-insensitive).
/// 3. Strip a single leading `v`/`V`.
/// 4. Replace underscores with periods.
///
/// Returns `None` when nothing usable remains.
pub fn normalize(tag: &str, pattern: Option<&TagPattern>) -> Option<String> {
    if tag.is_empty() {
        return None;
    }

    let extracted = match pattern {
        Some(p) => p.extract(tag)?,
        None => tag,
    };

    let mut version = extracted.trim();
    version = strip_marker(version, "REL");
    version = strip_marker(version, "VER");
    version = version
        .strip_prefix(['v', 'V'])
        .unwrap_or(version);

    let version = version.replace('_', ".");
    let version = version.trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

/// Strip a leading `<marker>_` or `<marker>-`, case-insensitive.
fn strip_marker<'a>(version: &'a str, marker: &str) -> &'a str {
    let bytes = version.as_bytes();
    let n = marker.len();
    if bytes.len() <= n {
        return version;
    }
    if bytes[..n].eq_ignore_ascii_case(marker.as_bytes()) && matches!(bytes[n], b'_' | b'-') {
        &version[n + 1..]
    } else {
        version
    }
}
