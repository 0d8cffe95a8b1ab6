//! Demonstration binary.
//!
//! Wires a minimal [`Injector`] implementation driven by an explicit virtual
//! clock and drives the engine through a short storyline — cold start, a
//! user interaction, a simulated idle period, and charging parole — logging
//! every transition. Not a production entry point: a real host process
//! supplies its own `Injector` over the platform's actual
//! power/display/package-manager services and constructs [`StandbyEngine`]
//! the same way.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use standby_engine::clock::Injector;
use standby_engine::config::EngineConfig;
use standby_engine::{BootPhase, EventKind, StandbyEngine};

/// A demo injector driven by an explicit virtual clock rather than real wall
/// time, so the storyline below is reproducible without actually sleeping
/// for 48 simulated hours.
#[derive(Debug)]
struct DemoInjector {
    elapsed_ms: AtomicU64,
    charging: AtomicBool,
    display_on: AtomicBool,
    settings: Mutex<String>,
}

impl DemoInjector {
    fn new() -> Self {
        Self {
            elapsed_ms: AtomicU64::new(0),
            charging: AtomicBool::new(false),
            display_on: AtomicBool::new(true),
            settings: Mutex::new(String::new()),
        }
    }

    fn advance(&self, by_ms: u64) -> u64 {
        self.elapsed_ms.fetch_add(by_ms, Ordering::SeqCst) + by_ms
    }
}

impl Injector for DemoInjector {
    fn elapsed_realtime(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }

    fn current_time_millis(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }

    fn is_charging(&self) -> bool {
        self.charging.load(Ordering::SeqCst)
    }

    fn is_app_idle_enabled(&self) -> bool {
        true
    }

    fn is_power_save_whitelist_except_idle(&self, _package: &str) -> bool {
        false
    }

    fn is_package_ephemeral(&self, _user: i32, _package: &str) -> bool {
        false
    }

    fn is_default_display_on(&self) -> bool {
        self.display_on.load(Ordering::SeqCst)
    }

    fn is_bound_widget_package(&self, _package: &str, _user: i32) -> bool {
        false
    }

    fn get_active_network_scorer(&self) -> Option<String> {
        None
    }

    fn get_running_user_ids(&self) -> Vec<i32> {
        vec![0]
    }

    fn get_app_idle_settings(&self) -> String {
        self.settings.lock().unwrap().clone()
    }

    fn note_event(&self, kind: &str, package: &str, user: i32) {
        info!(kind, package, user, "note_event");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| "standby_engine=info".into()),
        )
        .init();

    info!("starting app standby controller demo");

    let injector = Arc::new(DemoInjector::new());
    let engine = StandbyEngine::new(injector.clone() as Arc<dyn Injector>);

    engine.on_boot_phase(config.initial_boot_phase).await;
    info!(
        idle_filtered_during_boot = engine
            .is_app_idle_filtered_or_paroled("com.example.app", 10_000, 0, 0)
            .await,
        "parole holds during early boot"
    );

    engine.on_boot_phase(BootPhase::BootCompleted).await;
    engine.spawn_scan_loop(config.scan_interval).await;

    engine
        .report_event(EventKind::UserInteraction, injector.elapsed_realtime(), 0, "com.example.app")
        .await;
    info!(
        bucket = %engine.get_app_standby_bucket("com.example.app", 0, injector.elapsed_realtime(), true).await,
        "after user interaction"
    );

    let thresholds = engine.thresholds().await;
    let elapsed = injector.advance(thresholds.elapsed_thresholds[1] + 1);
    engine.check_idle_states(0).await;
    info!(
        bucket = %engine.get_app_standby_bucket("com.example.app", 0, elapsed, true).await,
        "after simulated idle period"
    );

    engine.set_charging_state(true).await;
    info!(
        "idle-filtered while charging: {}",
        engine
            .is_app_idle_filtered_or_paroled("com.example.app", 10_000, 0, elapsed)
            .await
    );

    engine.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    info!("demo complete");
    Ok(())
}
