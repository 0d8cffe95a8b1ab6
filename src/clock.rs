//! The [`Injector`] trait (C1): the only surface the engine depends on for
//! everything it does not own — clocks, device state, and the package
//! queries that exempt an app from idle filtering.
//!
//! Queries are synchronous and infallible by design (§7): an implementation
//! that can fail internally must swallow its own error and return the
//! conservative default, logging at its own call site. They are called from
//! within a locked critical section (§5), so a slow injector directly slows
//! the engine.

use std::fmt;

/// Everything the engine needs from the host platform.
///
/// Production code wires a real implementation over the OS's actual power,
/// display, and package-manager services. Tests supply a deterministic fake
/// so policy behavior can be checked without real time passing.
pub trait Injector: Send + Sync + fmt::Debug {
    /// Monotonic elapsed time in milliseconds; may pause during deep idle.
    fn elapsed_realtime(&self) -> u64;

    /// Wall-clock time in milliseconds since epoch.
    fn current_time_millis(&self) -> u64;

    fn is_charging(&self) -> bool;

    /// Master switch for the whole standby mechanism.
    fn is_app_idle_enabled(&self) -> bool;

    /// Power-save whitelist entries are exempt from idle filtering even when idle.
    fn is_power_save_whitelist_except_idle(&self, package: &str) -> bool;

    /// Ephemeral (instant) apps get conservative, exempt treatment.
    fn is_package_ephemeral(&self, user: i32, package: &str) -> bool;

    /// Drives the screen-on elapsed clock.
    fn is_default_display_on(&self) -> bool;

    fn is_bound_widget_package(&self, package: &str, user: i32) -> bool;

    /// The currently active network scorer package, if any; scorer is exempt.
    fn get_active_network_scorer(&self) -> Option<String>;

    fn get_running_user_ids(&self) -> Vec<i32>;

    /// The raw threshold settings string (§4.1 format); parsed by [`crate::settings`].
    fn get_app_idle_settings(&self) -> String;

    /// Observability sink; implementations may log, count, or ignore.
    fn note_event(&self, kind: &str, package: &str, user: i32);

    /// Registers a sink for display-change callbacks. Production injectors
    /// wire this to the platform's display manager; this crate's engine
    /// drives its screen clock and out-of-band scans through its own
    /// `on_display_changed` method instead of through this callback, so the
    /// default implementation ignores it. Kept on the trait because it is
    /// part of the platform surface an injector is expected to expose.
    fn register_display_listener(&self, _callback: Box<dyn Fn(bool, u64) + Send + Sync>) {}

    /// Opaque persistence root for a host-side snapshot writer. The engine
    /// never reads from this path itself.
    fn get_data_system_directory(&self) -> Option<String> {
        None
    }
}

/// Monotonic screen-on-time accumulator (§9 "Dual-clock accounting").
///
/// Advances only while the default display is on. A naive implementation
/// that samples only on scan ticks would mis-bucket across display
/// transitions that happen between ticks, so this accumulates the
/// completed on-periods explicitly and accounts for an in-progress one at
/// read time.
#[derive(Debug, Clone, Copy)]
pub struct ScreenClock {
    accumulated: u64,
    on_since: Option<u64>,
}

impl Default for ScreenClock {
    fn default() -> Self {
        Self {
            accumulated: 0,
            on_since: None,
        }
    }
}

impl ScreenClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accounting a new on-period, if the display was off.
    pub fn display_turned_on(&mut self, now: u64) {
        if self.on_since.is_none() {
            self.on_since = Some(now);
        }
    }

    /// Fold the in-progress on-period into the accumulator.
    pub fn display_turned_off(&mut self, now: u64) {
        if let Some(since) = self.on_since.take() {
            self.accumulated += now.saturating_sub(since);
        }
    }

    /// Read the live value, accounting for an in-progress on-period.
    pub fn read(&self, now: u64) -> u64 {
        match self.on_since {
            Some(since) => self.accumulated + now.saturating_sub(since),
            None => self.accumulated,
        }
    }
}


#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::Injector;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    /// A fully deterministic, manually-driven [`Injector`] for tests.
    ///
    /// Every clock and flag is advanced explicitly by the test; nothing
    /// reads real wall time.
    #[derive(Debug)]
    pub struct FakeInjector {
        elapsed: AtomicU64,
        wall: AtomicU64,
        charging: AtomicBool,
        app_idle_enabled: AtomicBool,
        display_on: AtomicBool,
        whitelisted: Mutex<Vec<String>>,
        widget_bound: Mutex<Vec<String>>,
        ephemeral: Mutex<Vec<(i32, String)>>,
        network_scorer: Mutex<Option<String>>,
        running_users: Mutex<Vec<i32>>,
        settings: Mutex<String>,
    }

    impl Default for FakeInjector {
        fn default() -> Self {
            Self {
                elapsed: AtomicU64::new(0),
                wall: AtomicU64::new(0),
                charging: AtomicBool::new(false),
                app_idle_enabled: AtomicBool::new(true),
                display_on: AtomicBool::new(true),
                whitelisted: Mutex::new(Vec::new()),
                widget_bound: Mutex::new(Vec::new()),
                ephemeral: Mutex::new(Vec::new()),
                network_scorer: Mutex::new(None),
                running_users: Mutex::new(vec![0]),
                settings: Mutex::new(String::new()),
            }
        }
    }

    impl FakeInjector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_elapsed(&self, value: u64) {
            self.elapsed.store(value, Ordering::SeqCst);
        }

        pub fn set_charging(&self, value: bool) {
            self.charging.store(value, Ordering::SeqCst);
        }

        pub fn set_app_idle_enabled(&self, value: bool) {
            self.app_idle_enabled.store(value, Ordering::SeqCst);
        }

        pub fn set_display_on(&self, value: bool) {
            self.display_on.store(value, Ordering::SeqCst);
        }

        pub fn whitelist(&self, package: &str) {
            self.whitelisted.lock().unwrap().push(package.to_string());
        }

        pub fn set_settings(&self, raw: &str) {
            *self.settings.lock().unwrap() = raw.to_string();
        }
    }

    impl Injector for FakeInjector {
        fn elapsed_realtime(&self) -> u64 {
            self.elapsed.load(Ordering::SeqCst)
        }

        fn current_time_millis(&self) -> u64 {
            self.wall.load(Ordering::SeqCst)
        }

        fn is_charging(&self) -> bool {
            self.charging.load(Ordering::SeqCst)
        }

        fn is_app_idle_enabled(&self) -> bool {
            self.app_idle_enabled.load(Ordering::SeqCst)
        }

        fn is_power_save_whitelist_except_idle(&self, package: &str) -> bool {
            self.whitelisted.lock().unwrap().iter().any(|p| p == package)
        }

        fn is_package_ephemeral(&self, user: i32, package: &str) -> bool {
            self.ephemeral
                .lock()
                .unwrap()
                .iter()
                .any(|(u, p)| *u == user && p == package)
        }

        fn is_default_display_on(&self) -> bool {
            self.display_on.load(Ordering::SeqCst)
        }

        fn is_bound_widget_package(&self, package: &str, _user: i32) -> bool {
            self.widget_bound.lock().unwrap().iter().any(|p| p == package)
        }

        fn get_active_network_scorer(&self) -> Option<String> {
            self.network_scorer.lock().unwrap().clone()
        }

        fn get_running_user_ids(&self) -> Vec<i32> {
            self.running_users.lock().unwrap().clone()
        }

        fn get_app_idle_settings(&self) -> String {
            self.settings.lock().unwrap().clone()
        }

        fn note_event(&self, _kind: &str, _package: &str, _user: i32) {}
    }
}
