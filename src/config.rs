//! Process-level engine configuration (C10) — distinct from the per-app
//! [`crate::settings::ThresholdSettings`], which governs classification and
//! may come from the injector at runtime.
//!
//! Loaded from environment variables with compiled-in defaults, never
//! failing startup, matching how the teacher application loads `AppConfig`.
//! Only the demonstration binary and tests read this; the library itself
//! never touches the environment directly.

use std::time::Duration;

use crate::parole::BootPhase;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock cadence of the background scan timer (env: `SCAN_INTERVAL_SECS`).
    pub scan_interval: Duration,
    /// `tracing_subscriber::EnvFilter` string (env: `STANDBY_LOG`).
    pub log_filter: String,
    /// Boot phase the engine starts in (env: `STANDBY_INITIAL_BOOT_PHASE`,
    /// one of `system_services_ready` / `boot_completed`).
    pub initial_boot_phase: BootPhase,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30 * 60),
            log_filter: "standby_engine=info".to_string(),
            initial_boot_phase: BootPhase::SystemServicesReady,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scan_interval: std::env::var("SCAN_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.scan_interval),
            log_filter: std::env::var("STANDBY_LOG").unwrap_or(defaults.log_filter),
            initial_boot_phase: std::env::var("STANDBY_INITIAL_BOOT_PHASE")
                .ok()
                .and_then(|v| match v.as_str() {
                    "system_services_ready" => Some(BootPhase::SystemServicesReady),
                    "boot_completed" => Some(BootPhase::BootCompleted),
                    _ => None,
                })
                .unwrap_or(defaults.initial_boot_phase),
        }
    }
}
