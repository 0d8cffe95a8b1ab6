//! The bucket policy (C4) — pure functions from history + clocks + thresholds
//! to a bucket, plus the precedence rules arbitrating between write sources.
//!
//! Kept free of locks, `tracing`, and injector calls so it can be exercised
//! directly by property tests (invariant I7: `get_app_standby_bucket` is a
//! pure function of its inputs).

use crate::history::{AppHistory, Bucket, Reason, ReasonKind};
use crate::settings::{ThresholdSettings, FREQUENT_RANK, RARE_RANK, WORKING_SET_RANK};

/// Timeout-driven classification (§4.2): the bucket the dual-clock rule
/// would assign right now, ignoring reason/source entirely.
pub fn classify_by_timeout(
    last_used_elapsed: u64,
    last_used_screen_on_elapsed: u64,
    elapsed: u64,
    elapsed_screen_on: u64,
    thresholds: &ThresholdSettings,
) -> Bucket {
    let elapsed_since_use = elapsed.saturating_sub(last_used_elapsed);
    let screen_on_since_use = elapsed_screen_on.saturating_sub(last_used_screen_on_elapsed);

    let qualifies = |rank: usize| {
        elapsed_since_use >= thresholds.elapsed_thresholds[rank]
            && screen_on_since_use >= thresholds.screen_thresholds[rank]
    };

    if qualifies(RARE_RANK) {
        Bucket::Rare
    } else if qualifies(FREQUENT_RANK) {
        Bucket::Frequent
    } else if qualifies(WORKING_SET_RANK) {
        Bucket::WorkingSet
    } else {
        Bucket::Active
    }
}

/// Whether a `PREDICTED` history is still fresh, per the prediction-timeout
/// rule (§4.2, §9): freshness is judged solely against
/// `elapsed_thresholds[FREQUENT_RANK]`, measured from `last_predicted_at_elapsed`.
pub fn prediction_is_fresh(last_predicted_at_elapsed: u64, elapsed: u64, thresholds: &ThresholdSettings) -> bool {
    elapsed.saturating_sub(last_predicted_at_elapsed) < thresholds.elapsed_thresholds[FREQUENT_RANK]
}

/// Apply the prediction-timeout check to a history whose current reason is
/// `PREDICTED`. If the prediction has gone stale, demotes the bucket by
/// exactly one rank and reassigns reason `TIMEOUT`. Returns `true` if the
/// history was mutated.
///
/// No-op (returns `false`) if `current_reason` is not `PREDICTED`, or if the
/// prediction is still fresh.
pub fn apply_prediction_timeout(history: &mut AppHistory, elapsed: u64, thresholds: &ThresholdSettings) -> bool {
    if history.current_reason.kind != ReasonKind::Predicted {
        return false;
    }
    let predicted_at = match history.last_predicted_at_elapsed {
        Some(t) => t,
        None => return false,
    };
    if prediction_is_fresh(predicted_at, elapsed, thresholds) {
        return false;
    }

    history.current_bucket = history.current_bucket.demote_one_rank();
    history.current_reason = Reason::timeout();
    history.bucket_set_at_elapsed = elapsed;
    true
}

/// The 5x5 acceptance matrix (§4.2): may `new_reason` overwrite a history
/// currently holding `current_reason`? Side conditions specific to
/// `PREDICTED` (invariants I2/I3/I6) are applied separately in [`set_bucket`].
pub fn precedence_allows(new_reason: ReasonKind, current_reason: ReasonKind) -> bool {
    use ReasonKind::*;
    match new_reason {
        Forced => true,
        Usage | Predicted | Timeout => current_reason != Forced,
        Default => current_reason == Default,
    }
}

/// Source-arbitrated assignment (§4.2). Mutates `history` and returns
/// `true` iff the write was accepted. A rejected write is a documented,
/// silent no-op (§7) — callers log at `trace` level.
pub fn set_bucket(history: &mut AppHistory, new_bucket: Bucket, new_reason: Reason, now: u64) -> bool {
    if !precedence_allows(new_reason.kind, history.current_reason.kind) {
        return false;
    }

    if new_reason.kind == ReasonKind::Predicted {
        // I2: a predicted write must never produce NEVER.
        if new_bucket == Bucket::Never {
            return false;
        }
        // I6: once a history has settled on NEVER (non-predicted), predicted
        // writes are silently ignored even though the matrix above would
        // otherwise allow e.g. PREDICTED over TIMEOUT.
        if history.current_bucket == Bucket::Never {
            return false;
        }
    }

    history.current_bucket = new_bucket;
    history.current_reason = new_reason.clone();
    history.bucket_set_at_elapsed = now;
    if new_reason.kind == ReasonKind::Predicted {
        history.last_predicted_bucket = Some(new_bucket);
        history.last_predicted_at_elapsed = Some(now);
    }
    true
}

/// A read-only, non-mutating view of "what bucket would this history be in
/// right now" (used by `get_app_standby_bucket`, invariant I7).
///
/// Mirrors the scanner's decision (stale prediction demotes one rank,
/// otherwise the more-idle of the stored bucket and the live timeout
/// candidate) without writing anything back — the actual commit happens
/// only on the next real scan tick. When `include_screen_time` is `false`
/// the screen-on gate is dropped from the live candidate, so a caller that
/// only cares about elapsed time isn't blocked by a screen that has stayed off.
pub fn live_bucket_view(
    history: &AppHistory,
    elapsed: u64,
    elapsed_screen_on: u64,
    thresholds: &ThresholdSettings,
    include_screen_time: bool,
) -> Bucket {
    if history.current_reason.kind == ReasonKind::Forced {
        return history.current_bucket;
    }
    if history.current_bucket == Bucket::Never && history.current_reason.kind != ReasonKind::Predicted {
        return history.current_bucket;
    }
    if history.current_reason.kind == ReasonKind::Predicted {
        return match history.last_predicted_at_elapsed {
            Some(predicted_at) if !prediction_is_fresh(predicted_at, elapsed, thresholds) => {
                history.current_bucket.demote_one_rank()
            }
            _ => history.current_bucket,
        };
    }

    let effective = if include_screen_time {
        *thresholds
    } else {
        ThresholdSettings {
            elapsed_thresholds: thresholds.elapsed_thresholds,
            screen_thresholds: [0; 4],
        }
    };

    let candidate = classify_by_timeout(
        history.last_used_elapsed,
        history.last_used_screen_on_elapsed,
        elapsed,
        elapsed_screen_on,
        &effective,
    );
    if candidate > history.current_bucket {
        candidate
    } else {
        history.current_bucket
    }
}
