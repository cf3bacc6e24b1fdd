use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use review_bridge::config::BridgeConfig;
use review_bridge::diffmap::build_map;
use review_bridge::sync::parser::parse_message;
use review_bridge::sync::{self, ArchiveScanner, CycleOutcome};
use review_bridge::threading::MessageArena;
use review_bridge::{BridgeError, extract_comments, init_logger};

#[derive(Parser, Debug)]
#[command(
    name = "review-bridge",
    about = "Turn mailing-list patch threads into code review payloads"
)]
struct Args {
    /// Rayon pool size for parsing archived emails.
    #[arg(long, global = true)]
    parse_threads: Option<usize>,

    /// Tag stamped on every review payload.
    #[arg(long, global = true)]
    review_tag: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble one thread and print its patchset and reviews.
    Thread {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Message-ID of the thread root, brackets included.
        #[arg(long)]
        id: String,
    },
    /// Plan and process everything found in an archive directory once.
    Batch {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Poll an archive directory and process new messages as they land.
    Watch {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Seconds between polls.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Print the comments a reply makes on its parent (both raw emails).
    Comments {
        #[arg(long)]
        parent: PathBuf,
        #[arg(long)]
        reply: PathBuf,
    },
    /// Print the review position of a raw line of a patch email.
    Map {
        #[arg(long)]
        patch: PathBuf,
        #[arg(long)]
        line: i32,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BridgeError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn load_arena(dir: &Path, config: &BridgeConfig) -> Result<(MessageArena, Vec<String>), BridgeError> {
    let messages = sync::load_directory(dir, config.parse_threads)?;
    let mut arena = MessageArena::new();
    let new_ids = arena.insert_batch(messages);
    Ok((arena, new_ids))
}

fn print_outcome(outcome: &CycleOutcome) -> Result<(), BridgeError> {
    for report in &outcome.reports {
        print_json(report)?;
    }
    Ok(())
}

async fn watch(dir: PathBuf, config: BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut arena = MessageArena::new();
    let mut scanner = ArchiveScanner::new(dir);
    let mut ticker = tokio::time::interval(config.poll_interval);
    let mut cycle: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down after {} cycles", cycle);
                return Ok(());
            }
        }
        cycle += 1;

        let new_files = match scanner.take_new_files() {
            Ok(files) => files,
            Err(e) => {
                log::error!("cycle {}: failed to list {}: {}", cycle, scanner.dir().display(), e);
                continue;
            }
        };
        if new_files.is_empty() {
            log::debug!("cycle {}: no new files", cycle);
            continue;
        }

        let threads = config.parse_threads;
        let loaded = tokio::task::spawn_blocking(move || sync::load_files(&new_files, threads)).await?;
        let messages = match loaded {
            Ok(messages) => messages,
            Err(e) => {
                log::error!("cycle {}: failed to load new files: {}", cycle, e);
                continue;
            }
        };

        let new_ids = arena.insert_batch(messages);
        if new_ids.is_empty() {
            log::debug!("cycle {}: nothing new", cycle);
            continue;
        }

        let plan = sync::plan_uploads(&arena, &new_ids);
        let outcome = sync::run_plan(&arena, &plan, &config.review_tag);
        log::info!(
            "cycle {}: {} new messages, {} threads processed, {} failed",
            cycle,
            new_ids.len(),
            outcome.reports.len(),
            outcome.failed
        );
        print_outcome(&outcome)?;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let args = Args::parse();
    let mut config = BridgeConfig::from_env();
    if let Some(threads) = args.parse_threads {
        config.parse_threads = threads.max(1);
    }
    if let Some(tag) = args.review_tag {
        config.review_tag = tag;
    }

    match args.command {
        Command::Thread { dir, id } => {
            let dir = dir.unwrap_or_else(|| config.archive_dir.clone());
            let (arena, _) = load_arena(&dir, &config)?;
            let report = sync::process_thread(&arena, &id, &config.review_tag)?;
            print_json(&report)?;
        }
        Command::Batch { dir } => {
            let dir = dir.unwrap_or_else(|| config.archive_dir.clone());
            let (arena, new_ids) = load_arena(&dir, &config)?;
            let plan = sync::plan_uploads(&arena, &new_ids);
            let outcome = sync::run_plan(&arena, &plan, &config.review_tag);
            print_outcome(&outcome)?;
            if outcome.failed > 0 {
                log::warn!("{} threads failed", outcome.failed);
            }
        }
        Command::Watch { dir, interval } => {
            let dir = dir.unwrap_or_else(|| config.archive_dir.clone());
            if let Some(secs) = interval {
                config.poll_interval = Duration::from_secs(secs.max(1));
            }
            log::info!(
                "watching {} every {}s",
                dir.display(),
                config.poll_interval.as_secs()
            );
            watch(dir, config).await?;
        }
        Command::Comments { parent, reply } => {
            let parent = parse_message(&std::fs::read(parent)?)?;
            let reply = parse_message(&std::fs::read(reply)?)?;
            let comments = extract_comments(&parent.body, &reply.body).map_err(BridgeError::from)?;
            print_json(&comments)?;
        }
        Command::Map { patch, line } => {
            let patch = parse_message(&std::fs::read(patch)?)?;
            let map = build_map(&patch.body).map_err(BridgeError::from)?;
            let (file, mapped) = map.map(line);
            print_json(&serde_json::json!({ "file": file, "line": mapped }))?;
        }
    }

    Ok(())
}
