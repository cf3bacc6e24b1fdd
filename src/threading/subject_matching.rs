//! Subject normalization and revision matching
//!
//! A resent series keeps its subject text but bumps the `vN` token in its tag.
//! Normalizing the subject down to the text after the tag lets a new revision
//! find the message it supersedes.

use super::container::Message;
use super::patch_series;

/// Lower-cased subject text after the leading tag.
///
/// Everything up to and including the first `"] "` is dropped. Subjects
/// without a tag are only lower-cased.
///
/// ## Examples
///
/// ```rust
/// use review_bridge::threading::subject_matching::normalized_subject;
///
/// assert_eq!(
///     normalized_subject("[PATCH v2 1/3] Add New Feature"),
///     "add new feature"
/// );
/// assert_eq!(normalized_subject("Plain Subject"), "plain subject");
/// ```
pub fn normalized_subject(subject: &str) -> String {
    let text = match subject.find("] ") {
        Some(end_bracket) => &subject[end_bracket + 2..],
        None => subject,
    };
    text.to_lowercase()
}

/// Find the previous revision of `message` among `candidates`.
///
/// ## Algorithm
///
/// 1. Revisions below 2 have no predecessor
/// 2. Keep candidates with the same normalized subject and sender
/// 3. Order them newest first (undated candidates last)
/// 4. Return the first one tagged `v{N-1}`; when looking for the first
///    revision, a tag without any version token also qualifies
pub fn find_previous_version<'a>(
    message: &Message,
    candidates: impl IntoIterator<Item = &'a Message>,
) -> Option<&'a Message> {
    let version = message.version();
    if version < 2 {
        return None;
    }
    let previous = version - 1;
    let subject = message.normalized_subject();

    let mut matching: Vec<&Message> = candidates
        .into_iter()
        .filter(|candidate| candidate.id != message.id)
        .filter(|candidate| candidate.from == message.from)
        .filter(|candidate| candidate.normalized_subject() == subject)
        .collect();

    // Newest first; `None` sorts below every date so it lands last.
    matching.sort_by(|a, b| b.date.cmp(&a.date));

    matching.into_iter().find(|candidate| {
        if patch_series::subject_tag(&candidate.subject).is_none() {
            return false;
        }
        match patch_series::declared_version(&candidate.subject) {
            Some(found) => found == previous,
            None => previous == 1,
        }
    })
}
