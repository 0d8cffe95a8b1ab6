//! Parole controller (C5): derives the global `paroled` flag from charging
//! state, the app-idle master switch, and boot phase.
//!
//! While paroled, bucket state keeps being maintained by the scanner so
//! that un-parole resumes smoothly, but `is_app_idle_filtered_or_paroled`
//! reports `false` regardless of any individual app's bucket.

use tokio::sync::RwLock;

use crate::clock::Injector;

/// Boot lifecycle phases relevant to parole. Ordered: the engine is
/// constructed at `SystemServicesReady` and is fully live from
/// `BootCompleted` onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootPhase {
    SystemServicesReady,
    BootCompleted,
}

/// The two flags the engine tracks itself (charging, boot phase);
/// `app_idle_enabled` is re-queried from the injector on every check rather
/// than cached, since the master switch can flip at any time and the engine
/// has no callback for it.
#[derive(Debug, Clone, Copy)]
struct ParoleState {
    charging: bool,
    boot_phase: BootPhase,
}

/// Cheap-to-share holder of [`ParoleState`], following the same
/// `RwLock`-guarded-state convention used throughout this crate's other
/// shared handles ([`crate::history::AppHistoryStore`], the engine's
/// `RwLock<ThresholdSettings>`).
#[derive(Debug)]
pub struct ParoleController {
    state: RwLock<ParoleState>,
}

impl Default for ParoleController {
    fn default() -> Self {
        Self::new()
    }
}

impl ParoleController {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ParoleState {
                charging: false,
                boot_phase: BootPhase::SystemServicesReady,
            }),
        }
    }

    pub async fn set_charging(&self, charging: bool) {
        self.state.write().await.charging = charging;
    }

    pub async fn is_charging(&self) -> bool {
        self.state.read().await.charging
    }

    pub async fn set_boot_phase(&self, phase: BootPhase) {
        self.state.write().await.boot_phase = phase;
    }

    pub async fn boot_phase(&self) -> BootPhase {
        self.state.read().await.boot_phase
    }

    /// `paroled = charging || !app_idle_enabled || boot_phase < BOOT_COMPLETED`.
    pub async fn paroled(&self, injector: &dyn Injector) -> bool {
        let state = *self.state.read().await;
        state.charging || !injector.is_app_idle_enabled() || state.boot_phase < BootPhase::BootCompleted
    }
}
