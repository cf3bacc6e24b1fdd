use thiserror::Error;

/// Fatal problems with a thread's patch series.
///
/// Either one stops the whole thread: a partial or misordered series is not
/// uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("{message_id} (`{subject}`) declares {declared} patches but the thread has {found}")]
    SeriesIndexMismatch {
        message_id: String,
        subject: String,
        declared: u32,
        found: usize,
    },
    #[error("series index {index} appears more than once in the thread")]
    DuplicateSeriesIndex { index: u32 },
}
