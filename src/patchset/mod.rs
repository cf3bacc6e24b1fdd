//! Patchset assembly from a reply tree.
//!
//! A thread root is either a cover letter (`[PATCH 0/N]`) whose direct replies
//! are the patches and any discussion of the series, or a single patch sent on
//! its own. [`assemble`] splits the root's replies into those two groups, runs
//! comment extraction for every reply, and orders the patches by series index.
//!
//! The result is rebuilt from the arena every cycle and never updated in
//! place.

pub mod error;
pub mod resolve;

pub use error::AssembleError;

use crate::models::{Comment, CoverLetter, Patch, Patchset};
use crate::quoting::extract_comments;
use crate::threading::{Message, MessageArena};

/// Build the patchset for the thread rooted at `root`.
///
/// Comments come out anchored to raw lines of the message they reply to; see
/// [`Patchset::resolve_comments`] for placing them in the diff.
///
/// # Errors
///
/// - [`AssembleError::SeriesIndexMismatch`] when a patch's declared series
///   length differs from the number of patches found in the thread
/// - [`AssembleError::DuplicateSeriesIndex`] when two patches share an index
pub fn assemble(arena: &MessageArena, root: &Message) -> Result<Patchset, AssembleError> {
    let (patch_messages, cover_letter_replies) = classify_replies(arena, root);
    log::debug!(
        "thread {}: {} patches, {} cover letter replies",
        root.id,
        patch_messages.len(),
        cover_letter_replies.len()
    );

    let cover_letter = CoverLetter {
        text: root.body.clone(),
        comments: collect_comments(root, cover_letter_replies),
    };

    let standalone = patch_messages.len() == 1 && !root.is_reply();
    let total = patch_messages.len();

    let mut patches = Vec::with_capacity(total);
    for (message, (index, declared)) in patch_messages {
        let series_index = if standalone {
            0
        } else if declared as usize != total {
            return Err(AssembleError::SeriesIndexMismatch {
                message_id: message.id.clone(),
                subject: message.subject.clone(),
                declared,
                found: total,
            });
        } else {
            index
        };

        patches.push(Patch {
            message_id: message.id.clone(),
            text: message.body.clone(),
            text_with_headers: format!(
                "From: {}\nSubject: {}\n\n{}",
                message.from, message.subject, message.body
            ),
            series_index,
            comments: collect_comments(message, arena.children(message)),
            change_id: message.change_id.clone(),
            comments_resolved: false,
        });
    }

    patches.sort_by_key(|patch| patch.series_index);
    if let Some(pair) = patches
        .windows(2)
        .find(|pair| pair[0].series_index == pair[1].series_index)
    {
        return Err(AssembleError::DuplicateSeriesIndex {
            index: pair[0].series_index,
        });
    }

    Ok(Patchset {
        cover_letter,
        patches,
    })
}

type SeriesPosition = (u32, u32);

/// Split the root's direct replies into patches and cover letter replies.
///
/// A root that is not itself a reply and is tagged as the first patch of its
/// series counts as a patch too. A child cover letter heads a revised series
/// of its own and belongs to neither group.
fn classify_replies<'a>(
    arena: &'a MessageArena,
    root: &'a Message,
) -> (Vec<(&'a Message, SeriesPosition)>, Vec<&'a Message>) {
    let mut patches = Vec::new();
    let mut replies = Vec::new();

    if !root.is_reply() {
        if let Some(position @ (1, _)) = root.patch_index() {
            patches.push((root, position));
        }
    }

    for child in arena.children(root) {
        match child.patch_index() {
            Some(position) if child.is_patch() => patches.push((child, position)),
            Some(_) if child.is_coverletter() => {
                log::debug!("{} starts a new series under {}", child.id, root.id);
            }
            _ => replies.push(child),
        }
    }

    (patches, replies)
}

/// Concatenate the comments each reply makes on `parent`, in reply order.
///
/// A reply whose quoting cannot be reconciled with the parent contributes
/// nothing; the other replies are unaffected.
fn collect_comments<'a>(parent: &Message, replies: impl IntoIterator<Item = &'a Message>) -> Vec<Comment> {
    let mut comments = Vec::new();
    for reply in replies {
        match extract_comments(&parent.body, &reply.body) {
            Ok(found) => {
                log::debug!("{} comments from {} on {}", found.len(), reply.id, parent.id);
                comments.extend(found);
            }
            Err(err) => {
                log::warn!("dropping comments from {} on {}: {}", reply.id, parent.id, err);
            }
        }
    }
    comments
}
