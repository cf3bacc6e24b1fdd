//! Hunk body runs.
//!
//! A hunk body is a sequence of maximal runs of one line kind. Each run turns
//! into a single chunk whose raw range maps onto consecutive line numbers on
//! one side of the review tool:
//!
//! | kind      | first column | side | advances        |
//! |-----------|--------------|------|-----------------|
//! | unchanged | anything else| new  | old and new     |
//! | added     | `+`          | new  | new             |
//! | removed   | `-`          | old  | old             |
//!
//! Removed lines are numbered on the old side, so an edit (removal followed
//! by addition) places the removed text at its pre-edit line and the added
//! text at its post-edit line without either being shifted by the other.

use super::error::DiffMapError;
use super::parser::{LineCursor, is_end_of_hunk};
use super::{PatchFileChunkLineMap, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Unchanged,
    Added,
    Removed,
}

impl RunKind {
    pub fn classify(line: &str) -> RunKind {
        match line.as_bytes().first() {
            Some(b'+') => RunKind::Added,
            Some(b'-') => RunKind::Removed,
            _ => RunKind::Unchanged,
        }
    }

    pub fn side(self) -> Side {
        match self {
            RunKind::Unchanged | RunKind::Added => Side::New,
            RunKind::Removed => Side::Old,
        }
    }
}

/// Next old-side and new-side line numbers within the current hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkCounters {
    pub orig_line: i32,
    pub new_line: i32,
}

/// `\ No newline at end of file` belongs to neither side.
fn is_no_newline_marker(line: &str) -> bool {
    line.starts_with('\\')
}

/// Parse the run starting at the cursor.
///
/// Returns `Ok(None)` when the cursor sat on a line that produces no chunk.
pub fn parse_run(
    cursor: &mut LineCursor<'_>,
    counters: &mut HunkCounters,
) -> Result<Option<PatchFileChunkLineMap>, DiffMapError> {
    let Some(line) = cursor.peek() else {
        return Err(DiffMapError::chunk(cursor.position(), "unexpected end of hunk", ""));
    };

    if is_no_newline_marker(line) {
        cursor.advance();
        return Ok(None);
    }

    let start = cursor.position();
    let kind = RunKind::classify(line);
    let chunk = match kind {
        RunKind::Unchanged => parse_unchanged_run(cursor, counters),
        RunKind::Added => parse_added_run(cursor, counters),
        RunKind::Removed => parse_removed_run(cursor, counters),
    };

    if cursor.position() == start {
        return Err(DiffMapError::chunk(start, "could not consume a line of this run", line));
    }
    Ok(Some(chunk))
}

/// Consume lines of `kind`, returning how many were taken.
fn consume_run(cursor: &mut LineCursor<'_>, kind: RunKind) -> i32 {
    let mut taken = 0;
    while !is_end_of_hunk(cursor) {
        match cursor.peek() {
            Some(line) if !is_no_newline_marker(line) && RunKind::classify(line) == kind => {
                log::trace!("consuming {:?} line: {}", kind, line);
                cursor.advance();
                taken += 1;
            }
            _ => break,
        }
    }
    taken
}

/// Chunk covering `[start, cursor)` whose last line lands on `line_after - 1`.
fn chunk_ending_at(cursor: &LineCursor<'_>, start: usize, kind: RunKind, line_after: i32) -> PatchFileChunkLineMap {
    let raw_end = cursor.position() as i32;
    PatchFileChunkLineMap {
        in_range: (start as i32, raw_end - 1),
        side: kind.side(),
        offset: line_after - raw_end,
    }
}

fn parse_unchanged_run(cursor: &mut LineCursor<'_>, counters: &mut HunkCounters) -> PatchFileChunkLineMap {
    let start = cursor.position();
    let taken = consume_run(cursor, RunKind::Unchanged);
    counters.orig_line += taken;
    counters.new_line += taken;
    chunk_ending_at(cursor, start, RunKind::Unchanged, counters.new_line)
}

fn parse_added_run(cursor: &mut LineCursor<'_>, counters: &mut HunkCounters) -> PatchFileChunkLineMap {
    let start = cursor.position();
    let taken = consume_run(cursor, RunKind::Added);
    counters.new_line += taken;
    chunk_ending_at(cursor, start, RunKind::Added, counters.new_line)
}

fn parse_removed_run(cursor: &mut LineCursor<'_>, counters: &mut HunkCounters) -> PatchFileChunkLineMap {
    let start = cursor.position();
    let taken = consume_run(cursor, RunKind::Removed);
    counters.orig_line += taken;
    chunk_ending_at(cursor, start, RunKind::Removed, counters.orig_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_all(body: &str, orig_line: i32, new_line: i32) -> (Vec<PatchFileChunkLineMap>, HunkCounters) {
        let mut cursor = LineCursor::new(body);
        let mut counters = HunkCounters { orig_line, new_line };
        let mut chunks = Vec::new();
        while !is_end_of_hunk(&cursor) {
            if let Some(chunk) = parse_run(&mut cursor, &mut counters).unwrap() {
                chunks.push(chunk);
            }
        }
        (chunks, counters)
    }

    #[test]
    fn test_classify() {
        assert_eq!(RunKind::classify("+x"), RunKind::Added);
        assert_eq!(RunKind::classify("-x"), RunKind::Removed);
        assert_eq!(RunKind::classify(" x"), RunKind::Unchanged);
        assert_eq!(RunKind::classify(""), RunKind::Unchanged);
    }

    #[test]
    fn test_edit_pair_counters() {
        let (chunks, counters) = run_all(" a\n-b\n+B\n c", 10, 20);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].map(0), Some((Side::New, 20)));
        assert_eq!(chunks[1].map(1), Some((Side::Old, 11)));
        assert_eq!(chunks[2].map(2), Some((Side::New, 21)));
        assert_eq!(chunks[3].map(3), Some((Side::New, 22)));
        assert_eq!(counters, HunkCounters { orig_line: 13, new_line: 23 });
    }

    #[test]
    fn test_no_newline_marker_is_skipped() {
        let (chunks, counters) = run_all("-old\n\\ No newline at end of file\n+new", 5, 5);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].in_range, (0, 0));
        assert_eq!(chunks[1].in_range, (2, 2));
        assert_eq!(chunks[1].map(2), Some((Side::New, 5)));
        assert_eq!(counters, HunkCounters { orig_line: 6, new_line: 6 });
    }

    #[test]
    fn test_removed_run_stops_at_signature() {
        let (chunks, _) = run_all("-gone\n--\n2.28.0", 1, 1);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].in_range, (0, 0));
    }
}
