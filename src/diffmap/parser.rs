//! `git format-patch` body parsing.
//!
//! The body is walked with a [`LineCursor`] whose position is the raw line
//! index of the next unread line. Quoted-reply comments are anchored in the
//! same coordinate system, so every chunk range recorded here can be compared
//! directly with a comment's `raw_line`.
//!
//! Expected shape:
//!
//! ```text
//! <commit message>
//! ---
//!  path/to/file | 3 ++-
//!  1 file changed, 2 insertions(+), 1 deletion(-)
//!
//! diff --git a/path/to/file b/path/to/file
//! index 1111111..2222222 100644
//! --- a/path/to/file
//! +++ b/path/to/file
//! @@ -2,7 +2,8 @@ optional context
//!  ...
//! --
//! 2.28.0
//! ```

use regex::Regex;
use std::sync::OnceLock;

use super::error::DiffMapError;
use super::runs::{HunkCounters, parse_run};
use super::{PatchFileChunkLineMap, PatchFileLineMap, RawLineToGerritLineMap};

static HUNK_HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
static DIFF_LINE_REGEX: OnceLock<Regex> = OnceLock::new();
static DIFFSTAT_REGEX: OnceLock<Regex> = OnceLock::new();
static SUMMARY_REGEX: OnceLock<Regex> = OnceLock::new();
static CREATE_MODE_REGEX: OnceLock<Regex> = OnceLock::new();
static FILE_MODE_REGEX: OnceLock<Regex> = OnceLock::new();
static INDEX_REGEX: OnceLock<Regex> = OnceLock::new();
static OLD_FILE_REGEX: OnceLock<Regex> = OnceLock::new();
static NEW_FILE_REGEX: OnceLock<Regex> = OnceLock::new();

/// `@@ -orig_start[,len] +new_start[,len] @@ ...`
fn hunk_header_regex() -> &'static Regex {
    HUNK_HEADER_REGEX.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,\d+)? \+(\d+)(?:,\d+)? @@.*$").expect("Invalid hunk header regex")
    })
}

/// `diff --git a/X b/Y`, capturing Y.
fn diff_line_regex() -> &'static Regex {
    DIFF_LINE_REGEX.get_or_init(|| {
        Regex::new(r"^diff --git a/\S+ b/(\S+)$").expect("Invalid diff line regex")
    })
}

fn diffstat_regex() -> &'static Regex {
    DIFFSTAT_REGEX.get_or_init(|| {
        Regex::new(r"^\S+\s+\|\s+\d+(?: \+*-*)?$").expect("Invalid diffstat regex")
    })
}

fn summary_regex() -> &'static Regex {
    SUMMARY_REGEX.get_or_init(|| {
        Regex::new(
            r"^\d+ files? changed(?:, \d+ insertions?\(\+\))?(?:, \d+ deletions?\(-\))?$",
        )
        .expect("Invalid change summary regex")
    })
}

fn create_mode_regex() -> &'static Regex {
    CREATE_MODE_REGEX.get_or_init(|| {
        Regex::new(r"^create mode \d+ \S+$").expect("Invalid create mode regex")
    })
}

fn file_mode_regex() -> &'static Regex {
    FILE_MODE_REGEX.get_or_init(|| {
        Regex::new(r"^(?:new|deleted) file mode \d+$").expect("Invalid file mode regex")
    })
}

fn index_regex() -> &'static Regex {
    INDEX_REGEX.get_or_init(|| {
        Regex::new(r"^index [0-9a-f]+\.\.[0-9a-f]+(?: \d+)?$").expect("Invalid index regex")
    })
}

fn old_file_regex() -> &'static Regex {
    OLD_FILE_REGEX.get_or_init(|| {
        Regex::new(r"^--- (?:a/\S+|/dev/null)$").expect("Invalid old file regex")
    })
}

fn new_file_regex() -> &'static Regex {
    NEW_FILE_REGEX.get_or_init(|| {
        Regex::new(r"^\+\+\+ (?:b/\S+|/dev/null)$").expect("Invalid new file regex")
    })
}

/// Lines of a patch body plus the raw index of the next unread one.
///
/// Lines are right-trimmed only: the first column of a hunk line carries its
/// kind, and mail transport tends to leave `\r` and trailing blanks behind.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    position: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        LineCursor {
            lines: text.split('\n').map(str::trim_end).collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.position).copied()
    }

    pub fn advance(&mut self) {
        if self.position < self.lines.len() {
            self.position += 1;
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.lines.len()
    }

    /// Consume the next line if its trimmed text matches `regex`.
    fn eat(&mut self, regex: &Regex) -> bool {
        match self.peek() {
            Some(line) if regex.is_match(line.trim()) => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    /// Consume a required line, or fail with a header error.
    fn expect(&mut self, regex: &Regex, expected: &'static str) -> Result<(), DiffMapError> {
        if self.eat(regex) {
            Ok(())
        } else {
            Err(DiffMapError::header(
                self.position,
                expected,
                self.peek().unwrap_or_default(),
            ))
        }
    }
}

/// A hunk stops at end of input, the next hunk header, the next file diff,
/// or the `--` signature separator.
pub fn is_end_of_hunk(cursor: &LineCursor<'_>) -> bool {
    match cursor.peek() {
        None => true,
        Some(line) => {
            line == "--" || hunk_header_regex().is_match(line) || diff_line_regex().is_match(line)
        }
    }
}

/// Parse a patch email body into a raw-line position map.
///
/// # Errors
///
/// - [`DiffMapError::HeaderFormat`] when the commit message/diffstat preamble,
///   a file header, or the trailing content has an unexpected shape
/// - [`DiffMapError::ChunkFormat`] when a file has no hunks or a hunk run
///   cannot be parsed
pub fn build_map(diff_text: &str) -> Result<RawLineToGerritLineMap, DiffMapError> {
    let mut cursor = LineCursor::new(diff_text);
    skip_header(&mut cursor)?;

    let mut files = Vec::new();
    while let Some(file) = parse_file_entry(&mut cursor)? {
        log::debug!(
            "parsed {} covering lines {} to {}",
            file.name,
            file.in_range.0,
            file.in_range.1
        );
        files.push(file);
    }

    match cursor.peek() {
        None => {}
        Some(line) if line == "--" || line.trim().is_empty() => {}
        Some(line) => {
            return Err(DiffMapError::header(
                cursor.position(),
                "`--` terminator or blank line after the last file",
                line,
            ));
        }
    }

    Ok(RawLineToGerritLineMap::new(files))
}

/// Skip the commit message and diffstat, leaving the cursor on the first
/// `diff --git` line.
fn skip_header(cursor: &mut LineCursor<'_>) -> Result<(), DiffMapError> {
    // Ignore everything before the last '---'.
    let Some(separator) = cursor.lines.iter().rposition(|line| *line == "---") else {
        return Err(DiffMapError::header(
            0,
            "`---` separator before the diffstat",
            cursor.peek().unwrap_or_default(),
        ));
    };
    cursor.position = separator + 1;

    while cursor.eat(diffstat_regex()) {}
    cursor.expect(summary_regex(), "`N files changed` summary")?;
    while cursor.eat(create_mode_regex()) {}

    match cursor.peek() {
        Some(line) if line.trim().is_empty() => cursor.advance(),
        Some(line) => log::debug!("expected blank line after summary, instead got: {}", line),
        None => {}
    }

    match cursor.peek() {
        Some(line) if diff_line_regex().is_match(line) => Ok(()),
        found => Err(DiffMapError::header(
            cursor.position(),
            "`diff --git` line",
            found.unwrap_or_default(),
        )),
    }
}

fn parse_file_entry(cursor: &mut LineCursor<'_>) -> Result<Option<PatchFileLineMap>, DiffMapError> {
    let Some(name) = cursor
        .peek()
        .and_then(|line| diff_line_regex().captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return Ok(None);
    };
    cursor.advance();

    cursor.eat(file_mode_regex());
    cursor.expect(index_regex(), "`index <old>..<new>` line")?;
    cursor.expect(old_file_regex(), "`--- a/<path>` line")?;
    cursor.expect(new_file_regex(), "`+++ b/<path>` line")?;

    let mut chunks = Vec::new();
    while let Some(hunk) = parse_hunk(cursor)? {
        chunks.extend(hunk);
    }

    if chunks.is_empty() {
        return Err(DiffMapError::chunk(
            cursor.position(),
            "expected at least one hunk in file",
            cursor.peek().unwrap_or_default(),
        ));
    }

    Ok(Some(PatchFileLineMap::new(name, chunks)))
}

fn parse_hunk(cursor: &mut LineCursor<'_>) -> Result<Option<Vec<PatchFileChunkLineMap>>, DiffMapError> {
    let Some(caps) = cursor.peek().and_then(|line| hunk_header_regex().captures(line)) else {
        return Ok(None);
    };

    let header = cursor.peek().unwrap_or_default();
    let header_position = cursor.position();
    let parse_start = |group: usize| {
        caps.get(group)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .ok_or_else(|| DiffMapError::chunk(header_position, "hunk start out of range", header))
    };
    let mut counters = HunkCounters {
        orig_line: parse_start(1)?,
        new_line: parse_start(2)?,
    };
    log::debug!(
        "old starts at: {}, new starts at: {}",
        counters.orig_line,
        counters.new_line
    );
    cursor.advance();

    let mut chunks = Vec::new();
    while !is_end_of_hunk(cursor) {
        if let Some(chunk) = parse_run(cursor, &mut counters)? {
            chunks.push(chunk);
        }
    }

    Ok(Some(chunks))
}
