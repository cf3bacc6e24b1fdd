//! Review payloads for resolved patches.
//!
//! One [`ReviewInput`] per patch: inline comments grouped by file/side id,
//! everything that could not be placed joined into the top-level message.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Patch;

pub const DEFAULT_REVIEW_TAG: &str = "post_lkml_comments";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentInput {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub tag: String,
    pub notify: String,
    pub ignore_automatic_attention_set_rules: bool,
    pub message: String,
    pub labels: BTreeMap<String, i32>,
    pub comments: BTreeMap<String, Vec<CommentInput>>,
}

impl ReviewInput {
    /// Build the payload for `patch`.
    ///
    /// Returns `None` for a patch whose comment positions are unknown.
    pub fn for_patch(patch: &Patch, tag: &str) -> Option<Self> {
        if !patch.comments_resolved {
            return None;
        }

        let mut general = Vec::new();
        let mut comments: BTreeMap<String, Vec<CommentInput>> = BTreeMap::new();
        for comment in &patch.comments {
            if !comment.is_inline() {
                general.push(comment.message.as_str());
                continue;
            }
            comments
                .entry(comment.file.clone())
                .or_default()
                .push(CommentInput {
                    message: comment.message.clone(),
                    line: (comment.line >= 1).then_some(comment.line),
                });
        }

        Some(ReviewInput {
            tag: tag.to_string(),
            notify: "NONE".to_string(),
            ignore_automatic_attention_set_rules: true,
            message: general.join("\n\n"),
            labels: BTreeMap::from([("Code-Review".to_string(), 0)]),
            comments,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.comments.is_empty()
    }
}
