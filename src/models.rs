use serde::{Deserialize, Serialize};

/// Anchor used by comments written before any quoted text (salutations,
/// "On <date>, X wrote:" lines).
pub const NO_ANCHOR: i32 = -1;

/// Line number reported for comments that could not be placed in the diff.
pub const UNMAPPED_LINE: i32 = -1;

// ===== Review Comments =====

/// A remark recovered from a reply, anchored to the raw line of the message
/// it replies to.
///
/// `file` and `line` stay unset (`""` / `-1`) until the comment is resolved
/// against the patch's diff. A comment that stays unresolved is posted as a
/// whole-change remark rather than an inline one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub raw_line: i32,
    pub message: String,
    pub file: String,
    pub line: i32,
}

impl Comment {
    pub fn new(raw_line: i32, message: impl Into<String>) -> Self {
        Comment {
            raw_line,
            message: message.into(),
            file: String::new(),
            line: UNMAPPED_LINE,
        }
    }

    /// Whether the comment resolved to a file in the review tool.
    pub fn is_inline(&self) -> bool {
        !self.file.is_empty()
    }
}

// ===== Patchset Models =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLetter {
    pub text: String,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub message_id: String,
    /// The patch email body: commit message, diffstat and unified diff.
    pub text: String,
    /// `text` with a synthesized `From:`/`Subject:` header, ready for `git am`.
    pub text_with_headers: String,
    pub series_index: u32,
    pub comments: Vec<Comment>,
    /// Review-system change identifier, attached after a successful push.
    pub change_id: Option<String>,
    /// False when the diff could not be parsed and comment positions are unknown.
    pub comments_resolved: bool,
}

/// One cover letter plus its patches, ordered by series index.
///
/// Rebuilt from the message tree on every cycle; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patchset {
    pub cover_letter: CoverLetter,
    pub patches: Vec<Patch>,
}

impl Patchset {
    pub fn series_indices(&self) -> Vec<u32> {
        self.patches.iter().map(|patch| patch.series_index).collect()
    }
}
