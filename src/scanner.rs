//! Idle scanner (C6): the periodic, display-triggered, and on-demand sweep
//! that applies timeout-driven classification to every package for a user.
//!
//! A tick runs entirely under the history store's write lock (§4.4, §4.6),
//! so it is atomic with respect to every other engine operation.

use tracing::debug;

use crate::history::{AppHistory, AppHistoryStore, Bucket, Reason, ReasonKind};
use crate::policy;
use crate::settings::ThresholdSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub scanned: usize,
    pub changed: usize,
}

/// Run one scan tick for `user` (§4.4 steps 1-6).
pub async fn scan_user(
    store: &AppHistoryStore,
    user: i32,
    elapsed: u64,
    elapsed_screen_on: u64,
    thresholds: &ThresholdSettings,
) -> ScanSummary {
    let mut scanned = 0usize;

    let changes = store
        .scan_user_with(user, |_package, history| {
            scanned += 1;
            scan_one(history, elapsed, elapsed_screen_on, thresholds);
        })
        .await;

    let summary = ScanSummary {
        scanned,
        changed: changes.len(),
    };
    debug!(
        user,
        scanned = summary.scanned,
        changed = summary.changed,
        "scan tick complete"
    );
    summary
}

fn scan_one(history: &mut AppHistory, elapsed: u64, elapsed_screen_on: u64, thresholds: &ThresholdSettings) {
    // Step 2: FORCED histories and settled NEVER histories are untouched.
    if history.current_reason.kind == ReasonKind::Forced {
        return;
    }
    if history.current_bucket == Bucket::Never && history.current_reason.kind != ReasonKind::Predicted {
        return;
    }

    // Step 3: a stale prediction demotes one rank and becomes TIMEOUT before
    // ordinary classification runs this tick.
    policy::apply_prediction_timeout(history, elapsed, thresholds);
    if history.current_reason.kind == ReasonKind::Predicted {
        // Prediction is still fresh — sticky against ordinary demotion this tick.
        return;
    }

    // Steps 4-6: timeout-driven candidate, applied only if more idle.
    let candidate = policy::classify_by_timeout(
        history.last_used_elapsed,
        history.last_used_screen_on_elapsed,
        elapsed,
        elapsed_screen_on,
        thresholds,
    );
    if candidate > history.current_bucket {
        policy::set_bucket(history, candidate, Reason::timeout(), elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::AppHistory;

    fn thresholds() -> ThresholdSettings {
        ThresholdSettings::default()
    }

    #[tokio::test]
    async fn scan_promotes_idle_bucket_by_timeout() {
        let store = AppHistoryStore::new();
        let t = thresholds();
        store
            .update(
                0,
                "pkg",
                || AppHistory::fresh(Bucket::Active, Reason::usage(), 0),
                |_h| {},
            )
            .await;

        let summary = scan_user(&store, 0, t.elapsed_thresholds[1] + 1, t.elapsed_thresholds[1] + 1, &t).await;
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.changed, 1);

        let hist = store.read(0, "pkg").await.unwrap();
        assert_eq!(hist.current_bucket, Bucket::Frequent);
        assert_eq!(hist.current_reason.kind, ReasonKind::Timeout);
    }

    #[tokio::test]
    async fn scan_never_reclassifies_forced_histories() {
        let store = AppHistoryStore::new();
        let t = thresholds();
        store
            .update(
                0,
                "pkg",
                || AppHistory::fresh(Bucket::Rare, Reason::forced(), 0),
                |_h| {},
            )
            .await;

        scan_user(&store, 0, t.elapsed_thresholds[2] + 1, t.elapsed_thresholds[2] + 1, &t).await;
        let hist = store.read(0, "pkg").await.unwrap();
        assert_eq!(hist.current_bucket, Bucket::Rare);
        assert_eq!(hist.current_reason.kind, ReasonKind::Forced);
    }

    #[tokio::test]
    async fn two_consecutive_scans_with_unchanged_clocks_are_idempotent() {
        let store = AppHistoryStore::new();
        let t = thresholds();
        store
            .update(
                0,
                "pkg",
                || AppHistory::fresh(Bucket::Active, Reason::usage(), 0),
                |_h| {},
            )
            .await;

        let elapsed = t.elapsed_thresholds[1] + 1;
        scan_user(&store, 0, elapsed, elapsed, &t).await;
        let first = store.read(0, "pkg").await.unwrap();

        let second_summary = scan_user(&store, 0, elapsed, elapsed, &t).await;
        let second = store.read(0, "pkg").await.unwrap();

        assert_eq!(second_summary.changed, 0);
        assert_eq!(first.current_bucket, second.current_bucket);
        assert_eq!(first.current_reason, second.current_reason);
    }
}
