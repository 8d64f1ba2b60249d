//! Persistence for the protocol-stats cache slot.
//!
//! There is exactly one slot, keyed by [`STATS_CACHE_KEY`]. The record is
//! stored as `{"values": [...], "timestamp": <millis>}`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Well-known key of the stats cache record.
pub const STATS_CACHE_KEY: &str = "protocolStatsCache";

/// Cached protocol stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedStats {
    /// Metric strings in display order
    pub values: Vec<String>,
    /// When the values were fetched (Unix millis)
    pub timestamp: u64,
}

impl CachedStats {
    /// Age relative to `now_millis`.
    pub fn age_millis(&self, now_millis: u64) -> u64 {
        now_millis.saturating_sub(self.timestamp)
    }

    /// Whether the record is within `ttl_millis` of `now_millis` (inclusive).
    pub fn is_fresh(&self, now_millis: u64, ttl_millis: u64) -> bool {
        self.age_millis(now_millis) <= ttl_millis
    }
}

/// Single-slot store for [`CachedStats`].
///
/// Loading never fails: an unreadable record is treated as absent.
pub trait StatsStore: Send + Sync + Debug {
    /// Current record, if any.
    fn load(&self) -> Option<CachedStats>;

    /// Replace the record.
    fn save(&self, stats: &CachedStats);
}

/// In-memory slot.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    slot: RwLock<Option<CachedStats>>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStatsStore {
    fn load(&self) -> Option<CachedStats> {
        self.slot.read().clone()
    }

    fn save(&self, stats: &CachedStats) {
        *self.slot.write() = Some(stats.clone());
    }
}

/// JSON file `<dir>/protocolStatsCache.json`.
#[derive(Debug)]
pub struct FileStatsStore {
    path: PathBuf,
    /// Serializes writers within this process
    lock: RwLock<()>,
}

impl FileStatsStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", STATS_CACHE_KEY)),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsStore for FileStatsStore {
    fn load(&self) -> Option<CachedStats> {
        let _guard = self.lock.read();
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read stats cache");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt stats cache");
                None
            }
        }
    }

    fn save(&self, stats: &CachedStats) {
        let _guard = self.lock.write();
        let result = serde_json::to_string(stats)
            .map_err(std::io::Error::from)
            .and_then(|json| {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                // Write then rename so readers never see a partial record
                let tmp = self.path.with_extension("json.tmp");
                fs::write(&tmp, json)?;
                fs::rename(&tmp, &self.path)
            });

        match result {
            Ok(()) => debug!(path = %self.path.display(), "Stats cache written"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to write stats cache"),
        }
    }
}
