use thiserror::Error;

use crate::diffmap::DiffMapError;
use crate::patchset::AssembleError;
use crate::quoting::ExtractError;
use crate::sync::parser::ParseEmailError;

/// Errors surfaced by the bridge's orchestration and binary.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    DiffMap(#[from] DiffMapError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    ParseEmail(#[from] ParseEmailError),
    #[error("message {0} is not in the archive")]
    MessageNotFound(String),
    #[error("failed to build parser thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
