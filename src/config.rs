use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::review::DEFAULT_REVIEW_TAG;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Runtime settings for the bridge binary.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Directory of raw per-message files
    pub archive_dir: PathBuf,
    pub poll_interval: Duration,
    pub review_tag: String,
    /// Rayon pool size for raw email parsing
    pub parse_threads: usize,
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self {
            archive_dir: PathBuf::from(env_string("REVIEW_BRIDGE_ARCHIVE_DIR", "index_files")),
            poll_interval: env_duration_secs("REVIEW_BRIDGE_POLL_INTERVAL_SECS", 10),
            review_tag: env_string("REVIEW_BRIDGE_REVIEW_TAG", DEFAULT_REVIEW_TAG),
            parse_threads: env_usize("REVIEW_BRIDGE_PARSE_THREADS", num_cpus::get()),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
