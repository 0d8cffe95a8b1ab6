use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::bucket::Bucket;
use super::reason::Reason;

/// Per-(user, package) standby state.
///
/// One record is created on first touch (an event or a scan) and removed on
/// package uninstall; see §3 "Lifecycle".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppHistory {
    pub current_bucket: Bucket,
    pub current_reason: Reason,
    pub bucket_set_at_elapsed: u64,
    pub last_used_elapsed: u64,
    pub last_used_screen_on_elapsed: u64,
    pub last_predicted_bucket: Option<Bucket>,
    pub last_predicted_at_elapsed: Option<u64>,
    pub forced_idle: bool,
}

impl AppHistory {
    /// A brand-new record as of `elapsed`, matching the bucket/reason a newly
    /// discovered package gets before any event touches it.
    pub fn fresh(bucket: Bucket, reason: Reason, elapsed: u64) -> Self {
        Self {
            current_bucket: bucket,
            current_reason: reason,
            bucket_set_at_elapsed: elapsed,
            last_used_elapsed: 0,
            last_used_screen_on_elapsed: 0,
            last_predicted_bucket: None,
            last_predicted_at_elapsed: None,
            forced_idle: false,
        }
    }
}

/// A single (user, package) key into the history store.
pub type AppKey = (i32, String);

/// A bucket transition published to subscribers.
///
/// Only emitted when a commit actually changes `current_bucket` — an
/// accepted `set_bucket` call that keeps the same bucket (e.g. re-applying
/// USAGE while already ACTIVE) is silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketChange {
    pub user: i32,
    pub package: String,
    pub old_bucket: Bucket,
    pub new_bucket: Bucket,
    pub reason: Reason,
}

/// A versioned, serializable export of the whole store for a host-owned
/// persistence layer (§4.8). `CURRENT_VERSION` is bumped whenever the shape
/// of `AppHistory` changes in a way that isn't backward compatible.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub version: u32,
    pub entries: Vec<(i32, String, AppHistory)>,
}

impl HistorySnapshot {
    /// Serialize to the JSON form a host process writes under
    /// [`crate::clock::Injector::get_data_system_directory`]. The engine
    /// never does this itself (§6) — this is a convenience for the host.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<HistorySnapshot> {
        serde_json::from_str(raw)
    }
}

/// Thread-safe (user, package) → [`AppHistory`] map.
///
/// Cloning is cheap — clones share the same underlying data via `Arc`,
/// following the same handle-sharing pattern used throughout this crate's
/// other stateful components.
#[derive(Debug, Clone)]
pub struct AppHistoryStore {
    inner: Arc<RwLock<HashMap<AppKey, AppHistory>>>,
    changes: broadcast::Sender<BucketChange>,
}

impl Default for AppHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppHistoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Subscribe to bucket-change notifications. Multiple independent
    /// subscribers (e.g. a job scheduler and a power manager) may each hold
    /// their own receiver.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<BucketChange> {
        self.changes.subscribe()
    }

    /// Snapshot a single record.
    pub async fn read(&self, user: i32, package: &str) -> Option<AppHistory> {
        let map = self.inner.read().await;
        map.get(&(user, (*package).to_string())).cloned()
    }

    /// Snapshot all records for a user, sorted by package name ascending for
    /// deterministic scanner iteration (§4.4).
    pub async fn iter_user(&self, user: i32) -> Vec<(String, AppHistory)> {
        let map = self.inner.read().await;
        let mut out: Vec<(String, AppHistory)> = map
            .iter()
            .filter(|((u, _), _)| *u == user)
            .map(|((_, pkg), hist)| (pkg.clone(), hist.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Remove a record (package uninstall). Returns the removed record, if any.
    pub async fn remove(&self, user: i32, package: &str) -> Option<AppHistory> {
        let mut map = self.inner.write().await;
        map.remove(&(user, package.to_string()))
    }

    /// Mutate a single record under the store's write lock, creating it via
    /// `make_default` on first touch. Publishes a [`BucketChange`] iff the
    /// mutation changed `current_bucket`.
    pub async fn update<F, R>(
        &self,
        user: i32,
        package: &str,
        make_default: impl FnOnce() -> AppHistory,
        mutate: F,
    ) -> R
    where
        F: FnOnce(&mut AppHistory) -> R,
    {
        let mut map = self.inner.write().await;
        let entry = map
            .entry((user, package.to_string()))
            .or_insert_with(make_default);
        let old_bucket = entry.current_bucket;
        let old_reason = entry.current_reason.clone();
        let result = mutate(entry);
        let new_bucket = entry.current_bucket;
        let new_reason = entry.current_reason.clone();
        drop(map);

        if new_bucket != old_bucket {
            debug!(
                user,
                package,
                old = %old_bucket,
                new = %new_bucket,
                reason = %new_reason,
                "bucket changed"
            );
            let _ = self.changes.send(BucketChange {
                user,
                package: package.to_string(),
                old_bucket,
                new_bucket,
                reason: new_reason,
            });
        } else {
            let _ = old_reason;
        }

        result
    }

    /// Hold the write lock for the whole closure — used by the scanner so a
    /// tick is atomic with respect to every other store operation (§5).
    pub async fn with_all_mut<R>(&self, f: impl FnOnce(&mut HashMap<AppKey, AppHistory>) -> R) -> R {
        let mut map = self.inner.write().await;
        f(&mut map)
    }

    /// Run `f` over every record for `user`, package-name ascending, under a
    /// single write-lock acquisition — the whole sweep is one atomic
    /// critical section (§4.4, §4.6). Returns the [`BucketChange`]s produced,
    /// already published to subscribers.
    pub async fn scan_user_with<F>(&self, user: i32, mut f: F) -> Vec<BucketChange>
    where
        F: FnMut(&str, &mut AppHistory),
    {
        let mut map = self.inner.write().await;
        let mut keys: Vec<AppKey> = map
            .keys()
            .filter(|(u, _)| *u == user)
            .cloned()
            .collect();
        keys.sort_by(|a, b| a.1.cmp(&b.1));

        let mut changes = Vec::new();
        for key in keys {
            let hist = map.get_mut(&key).expect("key collected from this map");
            let old_bucket = hist.current_bucket;
            f(&key.1, hist);
            if hist.current_bucket != old_bucket {
                changes.push(BucketChange {
                    user,
                    package: key.1.clone(),
                    old_bucket,
                    new_bucket: hist.current_bucket,
                    reason: hist.current_reason.clone(),
                });
            }
        }
        drop(map);

        for change in &changes {
            let _ = self.changes.send(change.clone());
        }
        changes
    }

    pub async fn snapshot(&self) -> HistorySnapshot {
        let map = self.inner.read().await;
        let entries = map
            .iter()
            .map(|((u, p), h)| (*u, p.clone(), h.clone()))
            .collect();
        HistorySnapshot {
            version: SNAPSHOT_VERSION,
            entries,
        }
    }

    pub async fn restore(&self, snapshot: HistorySnapshot) -> Result<(), crate::errors::EngineError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(crate::errors::EngineError::UnsupportedSnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let mut map = self.inner.write().await;
        map.clear();
        for (user, package, history) in snapshot.entries {
            map.insert((user, package), history);
        }
        Ok(())
    }
}
