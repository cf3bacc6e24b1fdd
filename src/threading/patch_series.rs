//! Patch series detection from subject tags
//!
//! Mailing list patches carry a bracketed tag at the very start of the subject:
//! - [PATCH] Single patch
//! - [PATCH 0/5] Cover letter describing the series
//! - [PATCH v2 3/5] Third patch of the second revision
//! - [RFC PATCH net-next 1/3] Subsystem-tagged request for comments
//!
//! Replies (`Re: [PATCH ...]`) do not start with a tag and are never patches.

use regex::Regex;
use std::sync::OnceLock;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static INDEX_REGEX: OnceLock<Regex> = OnceLock::new();
static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();

/// Leading `[tag] rest` of a subject.
///
/// The regex captures:
/// 1. Tag content - e.g. "PATCH v2 3/5"
/// 2. Remaining subject text
fn get_tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"^\[(.+?)\] (.*)$").expect("Invalid subject tag regex"))
}

/// Trailing `N/M` inside a tag.
fn get_index_regex() -> &'static Regex {
    INDEX_REGEX.get_or_init(|| {
        Regex::new(r"(?:^|\s)(\d+)/(\d+)$").expect("Invalid patch index regex")
    })
}

/// Standalone `vN` token inside a tag.
fn get_version_regex() -> &'static Regex {
    VERSION_REGEX.get_or_init(|| {
        Regex::new(r"(?:^|\s)[vV](\d+)(?:\s|$)").expect("Invalid patch version regex")
    })
}

/// Extract the bracketed tag from a subject, if the subject starts with one.
///
/// ```rust
/// use review_bridge::threading::patch_series::subject_tag;
///
/// assert_eq!(subject_tag("[PATCH v2 1/4] Add tests"), Some("PATCH v2 1/4"));
/// assert_eq!(subject_tag("Re: [PATCH v2 1/4] Add tests"), None);
/// ```
pub fn subject_tag(subject: &str) -> Option<&str> {
    get_tag_regex()
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse `(N, M)` from the subject tag.
///
/// ## Returns
///
/// - `None` if the subject carries no tag
/// - `Some((1, 1))` for a tag without a series marker, e.g. `[PATCH]`
/// - `Some((N, M))` for a tag ending in `N/M`
pub fn patch_index(subject: &str) -> Option<(u32, u32)> {
    let tag = subject_tag(subject)?;

    let Some(caps) = get_index_regex().captures(tag) else {
        return Some((1, 1));
    };

    let index = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let total = caps.get(2)?.as_str().parse::<u32>().ok()?;
    Some((index, total))
}

/// A subject tagged as a patch with series index N >= 1.
pub fn is_patch(subject: &str) -> bool {
    matches!(patch_index(subject), Some((index, _)) if index >= 1)
}

/// A subject tagged as the cover letter (N = 0) of a series.
pub fn is_coverletter(subject: &str) -> bool {
    matches!(patch_index(subject), Some((0, _)))
}

/// Revision declared by a `vN` token in the tag, if any.
pub fn declared_version(subject: &str) -> Option<u32> {
    let tag = subject_tag(subject)?;
    get_version_regex()
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Revision of the series; untagged versions count as the first revision.
pub fn version(subject: &str) -> u32 {
    declared_version(subject).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_index_series() {
        assert_eq!(patch_index("[PATCH 2/5] Fix memory leak"), Some((2, 5)));
        assert_eq!(patch_index("[PATCH v2 3/10] Add new feature"), Some((3, 10)));
    }

    #[test]
    fn test_patch_index_single_patch_defaults() {
        assert_eq!(patch_index("[PATCH] Fix memory leak"), Some((1, 1)));
        assert_eq!(patch_index("[PATCH v3] Fix memory leak"), Some((1, 1)));
    }

    #[test]
    fn test_patch_index_requires_leading_tag() {
        assert_eq!(patch_index("Re: [PATCH 2/5] Fix memory leak"), None);
        assert_eq!(patch_index("Regular email subject"), None);
    }

    #[test]
    fn test_cover_letter_is_not_patch() {
        let subject = "[PATCH v2 0/4] kselftests/arm64: add PAuth tests";
        assert!(is_coverletter(subject));
        assert!(!is_patch(subject));
    }

    #[test]
    fn test_rfc_patch_is_patch() {
        let subject = "[RFC PATCH net-next 1/3] Experimental feature";
        assert!(is_patch(subject));
        assert!(!is_coverletter(subject));
        assert_eq!(patch_index(subject), Some((1, 3)));
    }

    #[test]
    fn test_version() {
        assert_eq!(version("[PATCH v17 00/19] Big series"), 17);
        assert_eq!(version("[PATCH 1/2] No version"), 1);
        assert_eq!(declared_version("[PATCH 1/2] No version"), None);
        assert_eq!(declared_version("[PATCH v2] Fix vv3 handling"), Some(2));
    }

    #[test]
    fn test_leading_zero_index() {
        assert_eq!(patch_index("[PATCH v17 00/19] Big series"), Some((0, 19)));
        assert_eq!(patch_index("[PATCH v17 07/19] Part seven"), Some((7, 19)));
    }
}
