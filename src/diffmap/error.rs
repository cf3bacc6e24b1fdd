use thiserror::Error;

/// Errors raised while parsing a patch email into a position map.
///
/// Both variants are fatal for the patch: comments on it must not be uploaded
/// with positions that may be wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffMapError {
    #[error("malformed patch header at line {raw_line}: expected {expected}, found `{found}`")]
    HeaderFormat {
        raw_line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("malformed hunk at line {raw_line}: {reason} (`{found}`)")]
    ChunkFormat {
        raw_line: usize,
        reason: &'static str,
        found: String,
    },
}

impl DiffMapError {
    pub fn header(raw_line: usize, expected: &'static str, found: impl Into<String>) -> Self {
        DiffMapError::HeaderFormat {
            raw_line,
            expected,
            found: found.into(),
        }
    }

    pub fn chunk(raw_line: usize, reason: &'static str, found: impl Into<String>) -> Self {
        DiffMapError::ChunkFormat {
            raw_line,
            reason,
            found: found.into(),
        }
    }
}
