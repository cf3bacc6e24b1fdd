//! Reply trees and subject metadata
//!
//! The archive indexer hands over messages already deduplicated by Message-ID
//! and linked only once a parent is known. This module holds that tree and the
//! metadata derived from subjects.
//!
//! ## Module Structure
//!
//! - `container`: Message type and the id-keyed arena that owns the tree
//! - `patch_series`: Subject tag parsing (`[PATCH v2 3/5]`)
//! - `subject_matching`: Normalized subjects and previous-revision lookup

pub mod container;
pub mod patch_series;
pub mod subject_matching;

// Re-export main types and functions
pub use container::{Message, MessageArena};
pub use subject_matching::{find_previous_version, normalized_subject};
