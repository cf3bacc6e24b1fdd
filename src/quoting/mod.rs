//! Inline comment recovery from quoted replies.
//!
//! A reply to a patch email usually interleaves quoted lines of the patch with
//! the reviewer's remarks. This module separates the two and anchors every
//! remark to the last parent line quoted before it.
//!
//! # Pipeline
//!
//! 1. **Split**: both bodies become zero-indexed [`Line`]s
//! 2. **Prefix inference** (`trie`): vote on the quote marker the client used
//! 3. **Alignment** (`alignment`): pair quoted child lines with parent lines
//! 4. **Commentary**: every other child line becomes a [`CommentLine`] tagged
//!    with the last parent line quoted so far
//! 5. **Merging**: comment lines sharing an anchor are joined into one
//!    [`Comment`]
//!
//! Commentary written before any quote (salutations, `On <date>, X wrote:`)
//! lands on anchor [`NO_ANCHOR`].

pub mod alignment;
pub mod trie;

use thiserror::Error;

use crate::models::{Comment, NO_ANCHOR};

/// One line of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub index: usize,
    pub text: String,
}

/// A child line that echoes a parent line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedLine {
    pub parent_index: usize,
    pub child_index: usize,
}

/// A child line of new commentary, with the parent line it follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub last_parent_line: i32,
    pub child_index: usize,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("quoted line {child_index} `{child_text}` no longer matches parent line `{parent_text}`")]
    QuoteInconsistency {
        child_index: usize,
        child_text: String,
        parent_text: String,
    },
}

/// Split a body into zero-indexed lines.
pub fn to_lines(text: &str) -> Vec<Line> {
    text.lines()
        .enumerate()
        .map(|(index, text)| Line {
            index,
            text: text.to_string(),
        })
        .collect()
}

/// Collapse whitespace runs into single spaces and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of `line` after the quote prefix, if it carries one.
fn strip_quote<'a>(line: &'a str, quote_prefix: &str) -> Option<&'a str> {
    line.strip_prefix(quote_prefix)
}

/// Empty lines and bare quote markers (`>` for a `"> "` prefix).
fn is_blank(line: &str, quote_prefix: &str) -> bool {
    let trimmed = line.trim();
    let marker = quote_prefix.trim();
    trimmed.is_empty() || (!marker.is_empty() && trimmed == marker)
}

/// Recover the comments `child_body` makes on `parent_body`.
///
/// Pure function of its inputs: identical bodies always produce identical
/// comments. Every returned comment has `raw_line` set to a parent line index
/// (or [`NO_ANCHOR`]) and no resolved position yet.
///
/// # Errors
///
/// [`ExtractError::QuoteInconsistency`] if a line recorded as quoted no longer
/// matches its parent line during the commentary scan.
pub fn extract_comments(parent_body: &str, child_body: &str) -> Result<Vec<Comment>, ExtractError> {
    let parent_lines = to_lines(parent_body);
    let child_lines = to_lines(child_body);

    let quote_prefix = trie::infer_quote_prefix(&parent_lines, &child_lines);
    let quoted_lines = alignment::find_quoted_lines(&parent_lines, &child_lines, &quote_prefix);
    log::debug!(
        "{} of {} reply lines quote the parent",
        quoted_lines.len(),
        child_lines.len()
    );

    let comment_lines =
        filter_non_quoted_lines(&parent_lines, &child_lines, &quoted_lines, &quote_prefix)?;
    Ok(merge_comment_lines(comment_lines, &quote_prefix))
}

fn filter_non_quoted_lines(
    parent_lines: &[Line],
    child_lines: &[Line],
    quoted_lines: &[QuotedLine],
    quote_prefix: &str,
) -> Result<Vec<CommentLine>, ExtractError> {
    let mut comment_lines = Vec::new();
    let mut pending = quoted_lines.iter().peekable();
    let mut last_parent_line = NO_ANCHOR;

    for child_line in child_lines {
        if let Some(quoted) = pending.next_if(|q| q.child_index == child_line.index) {
            let parent_text = &parent_lines[quoted.parent_index].text;
            let echoed = strip_quote(&child_line.text, quote_prefix).map(normalize_whitespace);

            if echoed.as_deref() != Some(normalize_whitespace(parent_text).as_str()) {
                log::debug!("child line: {}", child_line.text);
                log::debug!("parent line: {}", parent_text);
                return Err(ExtractError::QuoteInconsistency {
                    child_index: child_line.index,
                    child_text: child_line.text.clone(),
                    parent_text: parent_text.clone(),
                });
            }

            last_parent_line = quoted.parent_index as i32;
            continue;
        }

        comment_lines.push(CommentLine {
            last_parent_line,
            child_index: child_line.index,
            text: child_line.text.clone(),
        });
    }

    Ok(comment_lines)
}

fn merge_comment_lines(mut comment_lines: Vec<CommentLine>, quote_prefix: &str) -> Vec<Comment> {
    comment_lines.sort_by_key(|line| line.child_index);

    // (anchor, lines) in first-seen order
    let mut groups: Vec<(i32, Vec<&str>)> = Vec::new();
    for line in &comment_lines {
        match groups.iter_mut().find(|(anchor, _)| *anchor == line.last_parent_line) {
            Some((_, texts)) => texts.push(&line.text),
            None => groups.push((line.last_parent_line, vec![&line.text])),
        }
    }

    groups
        .into_iter()
        .filter_map(|(anchor, texts)| {
            let first = texts.iter().position(|t| !is_blank(t, quote_prefix))?;
            let last = texts.iter().rposition(|t| !is_blank(t, quote_prefix))?;
            Some(Comment::new(anchor, texts[first..=last].join("\n")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH_BODY: &str = "\
Add a helper.

Signed-off-by: Dev <dev@example.com>
---
 lib/foo.c | 2 ++
 1 file changed, 2 insertions(+)

diff --git a/lib/foo.c b/lib/foo.c
index 1111111..2222222 100644
--- a/lib/foo.c
+++ b/lib/foo.c
@@ -1,3 +1,5 @@
 int foo(void)
 {
+	int x = 1;
+	return x;
 }";

    #[test]
    fn test_unquoted_reply_is_one_comment() {
        let comments = extract_comments("one\ntwo\nthree", "Looks good.\nThanks for the fix.\nAcked.").unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].raw_line, NO_ANCHOR);
        assert_eq!(comments[0].message, "Looks good.\nThanks for the fix.\nAcked.");
        assert_eq!(comments[0].file, "");
        assert_eq!(comments[0].line, -1);
    }

    #[test]
    fn test_inline_review_anchors_after_quote() {
        let reply = "\
On Mon, Dev wrote:
> diff --git a/lib/foo.c b/lib/foo.c
> index 1111111..2222222 100644
> --- a/lib/foo.c
> +++ b/lib/foo.c
> @@ -1,3 +1,5 @@
>  int foo(void)
>  {
> +	int x = 1;

Why not return 1 directly?

> +	return x;
>  }

Reviewed-by: Rev <rev@example.com>";

        let comments = extract_comments(PATCH_BODY, reply).unwrap();

        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0], Comment::new(NO_ANCHOR, "On Mon, Dev wrote:"));
        assert_eq!(comments[1], Comment::new(14, "Why not return 1 directly?"));
        assert_eq!(comments[2], Comment::new(16, "Reviewed-by: Rev <rev@example.com>"));
    }

    #[test]
    fn test_multi_paragraph_comment_keeps_inner_blank_lines() {
        let parent = "alpha\nbeta\ngamma";
        let reply = "> alpha\n\nFirst point.\n\nSecond point.\n\n> gamma";

        let comments = extract_comments(parent, reply).unwrap();
        assert_eq!(comments, vec![Comment::new(0, "First point.\n\nSecond point.")]);
    }

    #[test]
    fn test_bare_quote_markers_are_not_comments() {
        let parent = "alpha\n\nbeta";
        let reply = "> alpha\n>\n> beta\nok";

        let comments = extract_comments(parent, reply).unwrap();
        assert_eq!(comments, vec![Comment::new(2, "ok")]);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let reply = "Hi,\n> int foo(void)\nnit: static?\n>  {\n> +\tint x = 1;\nfine";
        let first = extract_comments(PATCH_BODY, reply).unwrap();
        let second = extract_comments(PATCH_BODY, reply).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_reply_has_no_comments() {
        assert!(extract_comments(PATCH_BODY, "").unwrap().is_empty());
    }

    #[test]
    fn test_inconsistent_quote_is_reported() {
        let parent_lines = to_lines("alpha\nbeta");
        let child_lines = to_lines("> alpha\n> gamma");
        let quoted = vec![QuotedLine {
            parent_index: 1,
            child_index: 1,
        }];

        let err = filter_non_quoted_lines(&parent_lines, &child_lines, &quoted, "> ").unwrap_err();
        assert!(matches!(err, ExtractError::QuoteInconsistency { child_index: 1, .. }));
    }
}
