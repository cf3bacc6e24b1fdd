//! Placing raw-line comments in the diff.

use crate::diffmap::{DiffMapError, build_map};
use crate::models::{Patch, Patchset};

impl Patch {
    /// Overwrite every comment's `file`/`line` with its position in the diff.
    ///
    /// The patch body is parsed once. On error the comments are left as they
    /// were and the patch stays unresolved.
    pub fn resolve_comments(&mut self) -> Result<(), DiffMapError> {
        let map = build_map(&self.text)?;
        for comment in &mut self.comments {
            let (file, line) = map.map(comment.raw_line);
            comment.file = file;
            comment.line = line;
        }
        self.comments_resolved = true;
        Ok(())
    }
}

impl Patchset {
    /// Resolve comment positions patch by patch.
    ///
    /// A patch whose diff cannot be parsed is skipped and reported; the others
    /// are still resolved.
    ///
    /// ## Returns
    ///
    /// `(message_id, error)` for every patch that stayed unresolved.
    pub fn resolve_comments(&mut self) -> Vec<(String, DiffMapError)> {
        let mut failures = Vec::new();
        for patch in &mut self.patches {
            if let Err(err) = patch.resolve_comments() {
                log::warn!(
                    "withholding {} comments on {}: {}",
                    patch.comments.len(),
                    patch.message_id,
                    err
                );
                patch.comments_resolved = false;
                failures.push((patch.message_id.clone(), err));
            }
        }
        failures
    }

    /// Patches whose comments can be uploaded.
    pub fn resolved_patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter().filter(|patch| patch.comments_resolved)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Comment, CoverLetter, NO_ANCHOR, Patch, Patchset};
    use crate::test_support::SAMPLE_PATCH;

    fn patch(id: &str, text: &str, comments: Vec<Comment>) -> Patch {
        Patch {
            message_id: id.to_string(),
            text: text.to_string(),
            text_with_headers: text.to_string(),
            series_index: 1,
            comments,
            change_id: None,
            comments_resolved: false,
        }
    }

    #[test]
    fn test_resolve_sets_positions() {
        let mut p = patch(
            "<p>",
            SAMPLE_PATCH,
            vec![Comment::new(14, "inline"), Comment::new(NO_ANCHOR, "general")],
        );
        p.resolve_comments().unwrap();

        assert!(p.comments_resolved);
        assert_eq!(p.comments[0].file, "lib/foo.c");
        assert_eq!(p.comments[0].line, 4);
        assert!(!p.comments[1].is_inline());
        assert_eq!(p.comments[1].line, -1);
    }

    #[test]
    fn test_bad_patch_is_isolated() {
        let mut patchset = Patchset {
            cover_letter: CoverLetter {
                text: String::new(),
                comments: Vec::new(),
            },
            patches: vec![
                patch("<bad>", "no diff here", vec![Comment::new(0, "lost")]),
                patch("<good>", SAMPLE_PATCH, vec![Comment::new(12, "kept")]),
            ],
        };

        let failures = patchset.resolve_comments();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "<bad>");
        assert_eq!(patchset.patches[0].comments[0].file, "");

        let resolved: Vec<_> = patchset.resolved_patches().map(|p| p.message_id.as_str()).collect();
        assert_eq!(resolved, vec!["<good>"]);
    }
}
