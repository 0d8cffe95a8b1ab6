//! Event ingress (C7): maps externally observed app activity onto bucket
//! transitions.
//!
//! Real user-facing interaction (`USER_INTERACTION`, `NOTIFICATION_SEEN`)
//! always takes effect, even against a `FORCED` history — this is
//! deliberately not gated by [`crate::policy::precedence_allows`], which
//! only arbitrates between *synthetic* writers (scanner, predictor,
//! external callers). A real tap from the user is ground truth.

use crate::history::{AppHistory, Bucket, Reason};

/// An observed app-activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The user directly interacted with the app (launched it, brought it
    /// to the foreground, etc).
    UserInteraction,
    /// The app posted a notification the user saw.
    NotificationSeen,
    /// The app continued a session from a previous day; diagnostic only.
    ContinuePreviousDay,
    /// A system-initiated interaction on the app's behalf; diagnostic only.
    SystemInteraction,
    /// The app's slice was pinned by a launcher/assistant; diagnostic only.
    SlicePinned,
}

impl EventKind {
    fn diagnostic_label(self) -> &'static str {
        match self {
            EventKind::UserInteraction => "USER_INTERACTION",
            EventKind::NotificationSeen => "NOTIFICATION_SEEN",
            EventKind::ContinuePreviousDay => "CONTINUE_PREVIOUS_DAY",
            EventKind::SystemInteraction => "SYSTEM_INTERACTION",
            EventKind::SlicePinned => "SLICE_PINNED",
        }
    }
}

/// Apply an event to a history record. Returns `true` iff `current_bucket`
/// changed.
///
/// `elapsed` and `elapsed_screen_on` are the dual clocks sampled by the
/// caller at the moment the event was submitted (§5 — the engine never
/// re-samples a clock mid-operation).
pub fn apply_event(
    history: &mut AppHistory,
    kind: EventKind,
    elapsed: u64,
    elapsed_screen_on: u64,
) -> bool {
    match kind {
        EventKind::UserInteraction => {
            let changed = history.current_bucket != Bucket::Active;
            history.current_bucket = Bucket::Active;
            history.current_reason = Reason::usage();
            history.bucket_set_at_elapsed = elapsed;
            history.last_used_elapsed = elapsed;
            history.last_used_screen_on_elapsed = elapsed_screen_on;
            history.forced_idle = false;
            changed
        }
        EventKind::NotificationSeen => {
            if history.current_bucket > Bucket::WorkingSet {
                history.current_bucket = Bucket::WorkingSet;
                history.current_reason = Reason::usage();
                history.bucket_set_at_elapsed = elapsed;
                true
            } else {
                false
            }
        }
        EventKind::ContinuePreviousDay
        | EventKind::SystemInteraction
        | EventKind::SlicePinned => false,
    }
}

/// The label reported to the injector's `note_event` observability sink.
pub fn note_event_label(kind: EventKind) -> &'static str {
    kind.diagnostic_label()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ReasonKind;

    #[test]
    fn user_interaction_always_wins_even_over_forced() {
        let mut h = AppHistory::fresh(Bucket::Rare, Reason::forced(), 0);
        h.forced_idle = true;
        let changed = apply_event(&mut h, EventKind::UserInteraction, 100, 50);
        assert!(changed);
        assert_eq!(h.current_bucket, Bucket::Active);
        assert_eq!(h.current_reason.kind, ReasonKind::Usage);
        assert!(!h.forced_idle);
        assert_eq!(h.last_used_elapsed, 100);
        assert_eq!(h.last_used_screen_on_elapsed, 50);
    }

    #[test]
    fn notification_seen_promotes_past_working_set_even_over_forced() {
        let mut h = AppHistory::fresh(Bucket::Rare, Reason::forced(), 0);
        let changed = apply_event(&mut h, EventKind::NotificationSeen, 10, 10);
        assert!(changed);
        assert_eq!(h.current_bucket, Bucket::WorkingSet);
    }

    #[test]
    fn notification_seen_does_not_touch_active() {
        let mut h = AppHistory::fresh(Bucket::Active, Reason::usage(), 0);
        let changed = apply_event(&mut h, EventKind::NotificationSeen, 10, 10);
        assert!(!changed);
        assert_eq!(h.current_bucket, Bucket::Active);
    }

    #[test]
    fn diagnostic_only_events_never_change_bucket() {
        for kind in [
            EventKind::ContinuePreviousDay,
            EventKind::SystemInteraction,
            EventKind::SlicePinned,
        ] {
            let mut h = AppHistory::fresh(Bucket::Rare, Reason::timeout(), 0);
            assert!(!apply_event(&mut h, kind, 10, 10));
            assert_eq!(h.current_bucket, Bucket::Rare);
        }
    }
}
