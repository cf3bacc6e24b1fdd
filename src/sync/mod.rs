//! Archive synchronization cycle.
//!
//! Each cycle reads the archive directory, stores the new messages in the
//! long-lived [`MessageArena`], decides which threads need work, and derives
//! fresh patchsets and review payloads for them. Nothing but the arena
//! survives a cycle.
//!
//! # Data Flow
//!
//! 1. **Loading**: parse every `*.txt`/`*.eml` file on a Rayon pool
//! 2. **Storing**: [`MessageArena::insert_batch`] dedups and links replies
//! 3. **Planning**: [`plan_uploads`] splits new ids into whole threads to
//!    upload and threads whose comments changed
//! 4. **Processing**: [`process_thread`] assembles and resolves each thread
//!
//! A failing file or thread is logged and counted; the rest of the cycle
//! continues.

pub mod parser;

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::BridgeError;
use crate::models::Patchset;
use crate::patchset::assemble;
use crate::review::ReviewInput;
use crate::sync::parser::parse_message;
use crate::threading::{Message, MessageArena, find_previous_version};

const MESSAGE_EXTENSIONS: [&str; 2] = ["txt", "eml"];

fn is_message_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| MESSAGE_EXTENSIONS.contains(&ext))
}

/// Message files directly inside `dir`, sorted by name.
fn message_files(dir: &Path) -> Result<Vec<PathBuf>, BridgeError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_message_file(path))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Parse every message file in `dir`, in file-name order.
///
/// Unreadable or unparseable files are logged and skipped.
///
/// # Errors
///
/// Fails only if the directory cannot be listed or the thread pool cannot be
/// built.
pub fn load_directory(dir: &Path, threads: usize) -> Result<Vec<Message>, BridgeError> {
    let paths = message_files(dir)?;
    log::info!("found {} message files in {}", paths.len(), dir.display());
    load_files(&paths, threads)
}

/// Parse `paths` on a pool of `threads` workers, keeping their order.
pub fn load_files(paths: &[PathBuf], threads: usize) -> Result<Vec<Message>, BridgeError> {
    log::info!("parsing {} files with {} threads", paths.len(), threads);

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;

    let parse_success = AtomicUsize::new(0);
    let parse_errors = AtomicUsize::new(0);

    let messages: Vec<Message> = thread_pool.install(|| {
        paths
            .par_iter()
            .filter_map(|path| match fs::read(path) {
                Ok(raw) => match parse_message(&raw) {
                    Ok(message) => {
                        parse_success.fetch_add(1, Ordering::Relaxed);
                        Some(message)
                    }
                    Err(e) => {
                        parse_errors.fetch_add(1, Ordering::Relaxed);
                        log::warn!("parse error for {}: {}", path.display(), e);
                        None
                    }
                },
                Err(e) => {
                    parse_errors.fetch_add(1, Ordering::Relaxed);
                    log::warn!("read error for {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    });

    log::info!(
        "parsing complete: {} ok, {} errors",
        parse_success.load(Ordering::Relaxed),
        parse_errors.load(Ordering::Relaxed)
    );

    Ok(messages)
}

/// Remembers which files of an archive directory have been handed out.
///
/// Files are expected to be complete when they appear; one that fails to
/// parse is not retried.
#[derive(Debug)]
pub struct ArchiveScanner {
    dir: PathBuf,
    seen: HashSet<PathBuf>,
}

impl ArchiveScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ArchiveScanner {
            dir: dir.into(),
            seen: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Message files that appeared since the previous call, in name order.
    pub fn take_new_files(&mut self) -> Result<Vec<PathBuf>, BridgeError> {
        let files = message_files(&self.dir)?;
        Ok(files
            .into_iter()
            .filter(|path| self.seen.insert(path.clone()))
            .collect())
    }
}

/// Work derived from one batch of new messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadPlan {
    /// Roots of threads whose patches must be pushed and commented
    pub threads_to_upload: Vec<String>,
    /// Messages that received new replies; their threads' comments are re-sent
    pub threads_with_new_comments: Vec<String>,
}

impl UploadPlan {
    pub fn is_empty(&self) -> bool {
        self.threads_to_upload.is_empty() && self.threads_with_new_comments.is_empty()
    }
}

/// Decide what to do with the messages stored in this cycle.
///
/// - new thread roots are uploaded
/// - a tagged patch or cover letter replying to an older message starts a
///   series of its own and is uploaded
/// - replies to a message uploaded in the same batch are covered by it
/// - replies to unknown messages are skipped
/// - any other reply queues its parent for comment re-upload
pub fn plan_uploads(arena: &MessageArena, new_ids: &[String]) -> UploadPlan {
    let new_messages: Vec<&Message> = new_ids.iter().filter_map(|id| arena.get(id)).collect();
    let roots = upload_roots(arena, &new_messages);

    let mut plan = UploadPlan::default();
    let mut queued = HashSet::new();

    for message in new_messages {
        if roots.contains(message.id.as_str()) {
            plan.threads_to_upload.push(message.id.clone());
            continue;
        }

        let Some(parent_id) = message.in_reply_to.as_deref() else {
            continue;
        };

        if roots.contains(parent_id) {
            continue;
        }

        if !arena.contains(parent_id) {
            log::debug!("skipping {}: parent {} is unknown", message.id, parent_id);
            continue;
        }

        if queued.insert(parent_id) {
            plan.threads_with_new_comments.push(parent_id.to_string());
        }
    }

    log::info!(
        "planned {} uploads and {} comment refreshes",
        plan.threads_to_upload.len(),
        plan.threads_with_new_comments.len()
    );
    plan
}

/// Ids among `new_messages` that start a series to upload.
///
/// A message's parent from the same batch is decided before the message
/// itself, so a series member is never mistaken for the start of one.
fn upload_roots<'a>(arena: &MessageArena, new_messages: &[&'a Message]) -> HashSet<&'a str> {
    let batch: HashMap<&str, &'a Message> = new_messages
        .iter()
        .map(|message| (message.id.as_str(), *message))
        .collect();

    let mut roots = HashSet::new();
    let mut decided = HashSet::new();

    for &message in new_messages {
        let mut chain = Vec::new();
        let mut current = Some(message);
        while let Some(m) = current {
            if decided.contains(m.id.as_str()) || chain.iter().any(|c: &&Message| c.id == m.id) {
                break;
            }
            chain.push(m);
            current = m.in_reply_to.as_deref().and_then(|parent| batch.get(parent).copied());
        }

        for m in chain.into_iter().rev() {
            let starts_series = match m.in_reply_to.as_deref() {
                None => true,
                Some(parent) => {
                    (m.is_patch() || m.is_coverletter())
                        && arena.contains(parent)
                        && !roots.contains(parent)
                }
            };
            if starts_series {
                roots.insert(m.id.as_str());
            }
            decided.insert(m.id.as_str());
        }
    }

    roots
}

/// Review payload for one patch of a processed thread.
#[derive(Debug, Clone, Serialize)]
pub struct PatchReview {
    pub message_id: String,
    pub series_index: u32,
    pub change_id: Option<String>,
    pub review: ReviewInput,
}

/// Everything derived for one thread in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadReport {
    pub root_id: String,
    /// Root of the revision this thread supersedes, if it is in the archive
    pub previous_version: Option<String>,
    pub patchset: Patchset,
    pub reviews: Vec<PatchReview>,
    /// Patches whose diff could not be parsed; their comments are withheld
    pub unresolved: Vec<String>,
}

/// Assemble the thread rooted at `root_id` and build its review payloads.
///
/// # Errors
///
/// - [`BridgeError::MessageNotFound`] when `root_id` is not in the arena
/// - [`BridgeError::Assemble`] when the series is inconsistent
pub fn process_thread(arena: &MessageArena, root_id: &str, review_tag: &str) -> Result<ThreadReport, BridgeError> {
    let root = arena
        .get(root_id)
        .ok_or_else(|| BridgeError::MessageNotFound(root_id.to_string()))?;

    let mut patchset = assemble(arena, root)?;
    let unresolved = patchset
        .resolve_comments()
        .into_iter()
        .map(|(message_id, _)| message_id)
        .collect();

    let reviews = patchset
        .resolved_patches()
        .filter_map(|patch| {
            ReviewInput::for_patch(patch, review_tag).map(|review| PatchReview {
                message_id: patch.message_id.clone(),
                series_index: patch.series_index,
                change_id: patch.change_id.clone(),
                review,
            })
        })
        .collect();

    let previous_version = find_previous_version(root, arena.messages()).map(|m| m.id.clone());
    if let Some(previous) = &previous_version {
        log::info!("{} supersedes {}", root.id, previous);
    }

    Ok(ThreadReport {
        root_id: root.id.clone(),
        previous_version,
        patchset,
        reviews,
        unresolved,
    })
}

/// Outcome of running a plan.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub reports: Vec<ThreadReport>,
    pub failed: usize,
}

/// Process every thread named by `plan`.
///
/// Comment refreshes are run on the series containing the replied-to
/// message, headed by its nearest cover letter, once per series and not again
/// if the series is already being uploaded.
pub fn run_plan(arena: &MessageArena, plan: &UploadPlan, review_tag: &str) -> CycleOutcome {
    let mut outcome = CycleOutcome::default();
    let mut processed = HashSet::new();

    let refresh_roots = plan
        .threads_with_new_comments
        .iter()
        .filter_map(|id| arena.series_root(id).map(|root| root.id.clone()));

    let roots: Vec<String> = plan.threads_to_upload.iter().cloned().chain(refresh_roots).collect();
    let total = roots.len();

    for root_id in roots {
        if !processed.insert(root_id.clone()) {
            continue;
        }
        match process_thread(arena, &root_id, review_tag) {
            Ok(report) => outcome.reports.push(report),
            Err(e) => {
                outcome.failed += 1;
                log::warn!("failed to process thread {}: {}", root_id, e);
            }
        }
    }

    if outcome.failed > 0 {
        log::warn!("failed to process {}/{} threads", outcome.failed, total);
    }
    outcome
}
