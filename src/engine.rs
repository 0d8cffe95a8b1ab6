//! Engine facade & task serialization (C8): the single owning handle a host
//! process constructs once, at boot phase `SYSTEM_SERVICES_READY`, and clones
//! freely from then on. A clone shares the same `Arc`-backed state, same as
//! [`crate::history::AppHistoryStore`] — cloning the engine is cheap and
//! every clone observes the same history, parole flags, and screen clock.
//!
//! All mutating operations serialize through the history store's internal
//! lock (and, for the screen clock and thresholds, two small locks of their
//! own); see §5 for why this is enough to get the "processed atomically
//! between task turns" model without a separate actor/message-queue layer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::clock::{Injector, ScreenClock};
use crate::errors::{EngineError, Result};
use crate::events::{self, EventKind};
use crate::history::{AppHistory, AppHistoryStore, Bucket, BucketChange, HistorySnapshot, Reason};
use crate::parole::{BootPhase, ParoleController};
use crate::policy;
use crate::scanner::{self, ScanSummary};
use crate::settings::ThresholdSettings;

/// The app standby controller. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct StandbyEngine {
    inner: Arc<Inner>,
}

struct Inner {
    injector: Arc<dyn Injector>,
    store: AppHistoryStore,
    parole: ParoleController,
    screen_clock: Mutex<ScreenClock>,
    thresholds: RwLock<ThresholdSettings>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for StandbyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandbyEngine").finish_non_exhaustive()
    }
}

impl StandbyEngine {
    /// Construct a new engine over `injector`. Boot phase starts at
    /// `SystemServicesReady` (§3 "Lifecycle"); call [`Self::on_boot_phase`]
    /// with `BootCompleted` once host startup work has finished.
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        let now = injector.elapsed_realtime();
        let mut screen_clock = ScreenClock::new();
        if injector.is_default_display_on() {
            screen_clock.display_turned_on(now);
        }
        let thresholds = ThresholdSettings::parse(&injector.get_app_idle_settings());

        Self {
            inner: Arc::new(Inner {
                injector,
                store: AppHistoryStore::new(),
                parole: ParoleController::new(),
                screen_clock: Mutex::new(screen_clock),
                thresholds: RwLock::new(thresholds),
                scan_task: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to bucket-change notifications (§4.5).
    pub fn subscribe_changes(&self) -> tokio::sync::broadcast::Receiver<BucketChange> {
        self.inner.store.subscribe_changes()
    }

    /// Currently loaded threshold settings.
    pub async fn thresholds(&self) -> ThresholdSettings {
        *self.inner.thresholds.read().await
    }

    /// Re-read and re-parse the threshold settings string from the injector.
    pub async fn reload_thresholds(&self) {
        let raw = self.inner.injector.get_app_idle_settings();
        let parsed = ThresholdSettings::parse(&raw);
        *self.inner.thresholds.write().await = parsed;
    }

    async fn elapsed_screen_on(&self, now: u64) -> u64 {
        self.inner.screen_clock.lock().await.read(now)
    }

    /// Event ingress (C7, §4.2 "Event mapping").
    ///
    /// An unknown (user, package) only gets a history record created for
    /// `UserInteraction` and `NotificationSeen`; any other event kind is
    /// dropped for a package the store has never heard of (§7).
    pub async fn report_event(&self, event: EventKind, elapsed: u64, user: i32, package: &str) {
        self.inner
            .injector
            .note_event(events::note_event_label(event), package, user);

        let creates_history = matches!(event, EventKind::UserInteraction | EventKind::NotificationSeen);
        if !creates_history && self.inner.store.read(user, package).await.is_none() {
            trace!(?event, package, user, "dropping diagnostic-only event for unknown package");
            return;
        }

        let screen_on = self.elapsed_screen_on(elapsed).await;
        let default_bucket = if matches!(event, EventKind::NotificationSeen) {
            Bucket::WorkingSet
        } else {
            Bucket::Active
        };

        self.inner
            .store
            .update(
                user,
                package,
                || AppHistory::fresh(default_bucket, Reason::default_reason(), elapsed),
                |h| {
                    events::apply_event(h, event, elapsed, screen_on);
                },
            )
            .await;
    }

    /// Read-only bucket view (§4.2 `live_bucket_view`, invariant I7). Never
    /// mutates the history; the real transition happens on the next scan.
    pub async fn get_app_standby_bucket(
        &self,
        package: &str,
        user: i32,
        elapsed: u64,
        include_screen_time: bool,
    ) -> Bucket {
        let Some(history) = self.inner.store.read(user, package).await else {
            return Bucket::Active;
        };
        let screen_on = self.elapsed_screen_on(elapsed).await;
        let thresholds = self.thresholds().await;
        policy::live_bucket_view(&history, elapsed, screen_on, &thresholds, include_screen_time)
    }

    /// Source-arbitrated assignment through a typed [`Bucket`] — infallible
    /// by construction (a rejected precedence check is a silent no-op, §7).
    pub async fn set_app_standby_bucket(&self, package: &str, user: i32, bucket: Bucket, reason: Reason, elapsed: u64) {
        self.inner
            .store
            .update(
                user,
                package,
                || AppHistory::fresh(Bucket::Active, Reason::default_reason(), elapsed),
                |h| {
                    if !policy::set_bucket(h, bucket, reason.clone(), elapsed) {
                        trace!(package, user, %reason, "set_app_standby_bucket rejected by precedence");
                    }
                },
            )
            .await;
    }

    /// Bridge from an external wire value / restored snapshot field where the
    /// bucket arrives as a raw integer that might not correspond to a
    /// defined bucket (§4.7, §7).
    pub async fn set_app_standby_bucket_raw(
        &self,
        package: &str,
        user: i32,
        raw_bucket: i32,
        reason: Reason,
        elapsed: u64,
    ) -> Result<()> {
        let bucket = Bucket::from_raw(raw_bucket).ok_or(EngineError::InvalidBucket(raw_bucket))?;
        self.set_app_standby_bucket(package, user, bucket, reason, elapsed).await;
        Ok(())
    }

    /// Administrative force-idle toggle (§4.2). This is itself the
    /// privileged writer, so unlike [`Self::set_app_standby_bucket`] it does
    /// not go through the precedence matrix — it assigns directly, which is
    /// what lets `force_idle_state(false)` recover a history pinned at RARE
    /// with reason FORCED (invariant I5).
    pub async fn force_idle_state(&self, package: &str, user: i32, idle: bool, elapsed: u64) {
        self.inner
            .store
            .update(
                user,
                package,
                || AppHistory::fresh(Bucket::Active, Reason::default_reason(), elapsed),
                |h| {
                    h.forced_idle = idle;
                    if idle {
                        h.current_bucket = Bucket::Rare;
                        h.current_reason = Reason::forced();
                    } else {
                        h.current_bucket = Bucket::Active;
                        h.current_reason = Reason::usage();
                    }
                    h.bucket_set_at_elapsed = elapsed;
                },
            )
            .await;
    }

    /// True iff `package` would currently be denied background work: bucket
    /// at least RARE and none of the standing exemptions apply. `uid` is the
    /// platform process uid, kept distinct from the multi-user profile
    /// `user` id for parity with the injector surface; this engine does not
    /// itself key anything off it beyond passing it through to the
    /// ephemeral-package query.
    pub async fn is_app_idle_filtered(&self, package: &str, uid: i32, user: i32, elapsed: u64) -> bool {
        let bucket = self.get_app_standby_bucket(package, user, elapsed, true).await;
        if bucket < Bucket::Rare {
            return false;
        }
        let injector = &self.inner.injector;
        if injector.is_power_save_whitelist_except_idle(package) {
            return false;
        }
        if injector.is_bound_widget_package(package, user) {
            return false;
        }
        if injector.get_active_network_scorer().as_deref() == Some(package) {
            return false;
        }
        if injector.is_package_ephemeral(uid, package) {
            return false;
        }
        true
    }

    /// As [`Self::is_app_idle_filtered`], but always `false` while the
    /// engine is paroled (§4.3, invariant I6).
    pub async fn is_app_idle_filtered_or_paroled(&self, package: &str, uid: i32, user: i32, elapsed: u64) -> bool {
        if self.inner.parole.paroled(self.inner.injector.as_ref()).await {
            return false;
        }
        self.is_app_idle_filtered(package, uid, user, elapsed).await
    }

    /// Force a scanner tick for `user` (§4.4).
    pub async fn check_idle_states(&self, user: i32) -> ScanSummary {
        let elapsed = self.inner.injector.elapsed_realtime();
        let screen_on = self.elapsed_screen_on(elapsed).await;
        let thresholds = self.thresholds().await;
        scanner::scan_user(&self.inner.store, user, elapsed, screen_on, &thresholds).await
    }

    /// As [`Self::check_idle_states`], but first validates `user` against
    /// the injector's [`Injector::get_running_user_ids`] enumeration,
    /// rejecting with [`EngineError::UnknownUser`] instead of scanning a
    /// (possibly already-departed) user's packages. Ordinary event ingress
    /// and the background scan loop use the unchecked form, since a user
    /// that logs out mid-tick is not itself an error condition for them;
    /// this strict form is for callers (e.g. an admin tool) that need to
    /// know the user id was actually valid.
    pub async fn check_idle_states_strict(&self, user: i32) -> Result<ScanSummary> {
        if !self.inner.injector.get_running_user_ids().contains(&user) {
            return Err(EngineError::UnknownUser(user));
        }
        Ok(self.check_idle_states(user).await)
    }

    /// Scan every currently running user, per the injector's enumeration.
    pub async fn check_idle_states_all_users(&self) {
        for user in self.inner.injector.get_running_user_ids() {
            self.check_idle_states(user).await;
        }
    }

    /// Lifecycle: charging transitions. A transition to `false` triggers an
    /// immediate out-of-band scan (§4.4) so buckets catch up right away
    /// instead of waiting for the next periodic tick.
    pub async fn set_charging_state(&self, charging: bool) {
        let was_charging = self.inner.parole.is_charging().await;
        self.inner.parole.set_charging(charging).await;
        debug!(charging, was_charging, "charging state updated");
        if was_charging && !charging {
            self.check_idle_states_all_users().await;
        }
    }

    /// Lifecycle: boot phase transitions. Reaching `BootCompleted` reloads
    /// thresholds from the injector once more (settings may have changed
    /// during boot) and starts the background scan loop (§4.6, §4.9).
    pub async fn on_boot_phase(&self, phase: BootPhase) {
        self.inner.parole.set_boot_phase(phase).await;
        debug!(?phase, "boot phase updated");
        if phase == BootPhase::BootCompleted {
            self.reload_thresholds().await;
        }
    }

    /// Display-on/off transition (§4.4: display-on triggers an immediate
    /// scan; §9: the accumulator must be folded at the transition, not
    /// sampled lazily at the next tick).
    pub async fn on_display_changed(&self, on: bool, elapsed: u64) {
        {
            let mut clock = self.inner.screen_clock.lock().await;
            if on {
                clock.display_turned_on(elapsed);
            } else {
                clock.display_turned_off(elapsed);
            }
        }
        if on {
            self.check_idle_states_all_users().await;
        }
    }

    /// Start the periodic background scan (§4.6, §4.9). A no-op if a loop is
    /// already running; call [`Self::shutdown`] first to replace it.
    pub async fn spawn_scan_loop(&self, interval: Duration) {
        let mut slot = self.inner.scan_task.lock().await;
        if slot.is_some() {
            return;
        }
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                engine.check_idle_states_all_users().await;
            }
        });
        *slot = Some(handle);
    }

    /// Stop the background scan loop, if one is running.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.inner.scan_task.lock().await.take() {
            handle.abort();
        }
    }

    /// Checkpoint codec (§4.8): export the whole history store.
    pub async fn snapshot(&self) -> HistorySnapshot {
        self.inner.store.snapshot().await
    }

    /// Checkpoint codec (§4.8): restore from a previously taken snapshot.
    /// Does not itself re-run policy; callers that restored at startup
    /// should follow with `on_boot_phase(BootCompleted)` to reconcile
    /// against the current clock.
    pub async fn restore(&self, snapshot: HistorySnapshot) -> Result<()> {
        self.inner.store.restore(snapshot).await
    }
}
