//! Raw-line to review-position mapping for patch emails.
//!
//! Comments recovered from replies are anchored to a line index of the patch
//! email body. The review tool wants a file, a side, and a line number in that
//! side's revision instead. [`build_map`] parses the patch body once; the
//! resulting [`RawLineToGerritLineMap`] answers any number of queries.
//!
//! File/side identifiers are the file name for the new revision and the file
//! name with a `b` suffix for the old one.

pub mod error;
pub mod parser;
pub mod runs;

pub use error::DiffMapError;
pub use parser::build_map;

use crate::models::UNMAPPED_LINE;

/// Revision a chunk's line numbers refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Post-change revision (right side)
    New,
    /// Pre-change revision (left side)
    Old,
}

impl Side {
    /// Suffix appended to the file name to form the side identifier.
    pub fn suffix(self) -> &'static str {
        match self {
            Side::New => "",
            Side::Old => "b",
        }
    }
}

/// A contiguous raw range mapped by a constant offset onto one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFileChunkLineMap {
    /// Inclusive raw line range
    pub in_range: (i32, i32),
    pub side: Side,
    pub offset: i32,
}

impl PatchFileChunkLineMap {
    pub fn contains(&self, raw_line: i32) -> bool {
        self.in_range.0 <= raw_line && raw_line <= self.in_range.1
    }

    pub fn map(&self, raw_line: i32) -> Option<(Side, i32)> {
        self.contains(raw_line)
            .then_some((self.side, raw_line + self.offset))
    }
}

/// The chunks of one file, in raw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFileLineMap {
    pub name: String,
    pub chunks: Vec<PatchFileChunkLineMap>,
    /// Raw range from the first chunk's start to the last chunk's end
    pub in_range: (i32, i32),
}

impl PatchFileLineMap {
    /// `chunks` must be non-empty and in raw order.
    pub fn new(name: String, chunks: Vec<PatchFileChunkLineMap>) -> Self {
        let start = chunks.first().map(|c| c.in_range.0).unwrap_or(0);
        let end = chunks.last().map(|c| c.in_range.1).unwrap_or(-1);
        PatchFileLineMap {
            name,
            chunks,
            in_range: (start, end),
        }
    }

    pub fn contains(&self, raw_line: i32) -> bool {
        self.in_range.0 <= raw_line && raw_line <= self.in_range.1
    }

    pub fn map(&self, raw_line: i32) -> Option<(String, i32)> {
        let mapped = self.chunks.iter().find_map(|chunk| chunk.map(raw_line));
        if mapped.is_none() {
            log::debug!("{} was not in any chunk of {}", raw_line, self.name);
        }
        mapped.map(|(side, line)| (format!("{}{}", self.name, side.suffix()), line))
    }
}

/// Position map for a whole patch email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLineToGerritLineMap {
    pub files: Vec<PatchFileLineMap>,
}

impl RawLineToGerritLineMap {
    pub fn new(files: Vec<PatchFileLineMap>) -> Self {
        RawLineToGerritLineMap { files }
    }

    pub fn contains(&self, raw_line: i32) -> bool {
        self.files.iter().any(|file| file.contains(raw_line))
    }

    /// Translate a raw line index into `(file_side_id, line)`.
    ///
    /// Lines outside every chunk (cover letter text, commit message, hunk
    /// headers) map to `("", -1)`; callers post those as whole-change remarks.
    pub fn map(&self, raw_line: i32) -> (String, i32) {
        self.files
            .iter()
            .find(|file| file.contains(raw_line))
            .and_then(|file| file.map(raw_line))
            .unwrap_or_else(|| {
                log::debug!("{} was not found in patch", raw_line);
                (String::new(), UNMAPPED_LINE)
            })
    }
}
