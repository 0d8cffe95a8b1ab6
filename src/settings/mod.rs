//! Per-app threshold settings (C2): `screen_thresholds=A/B/C/D,elapsed_thresholds=E/F/G/H`.
//!
//! Parsing never fails — a malformed or partial string falls back to the
//! compiled-in defaults, matching how this crate's other ambient
//! configuration (see [`crate::config`]) refuses to fail startup.

use tracing::warn;

/// Index into the four-entry threshold vectors for entering a bucket rank.
/// 0 → WORKING_SET, 1 → FREQUENT, 2 → RARE, 3 → reserved.
pub const WORKING_SET_RANK: usize = 0;
pub const FREQUENT_RANK: usize = 1;
pub const RARE_RANK: usize = 2;

const HOUR_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdSettings {
    pub elapsed_thresholds: [u64; 4],
    pub screen_thresholds: [u64; 4],
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            elapsed_thresholds: [12 * HOUR_MS, 24 * HOUR_MS, 48 * HOUR_MS, 48 * HOUR_MS],
            // Only RARE is screen-gated by default: WORKING_SET and FREQUENT
            // require no foreground display time, matching the "reserved
            // slot mirrors RARE for symmetry" rule in §4.1 (entry 3 equals
            // entry 2, same as the elapsed vector's trailing pair).
            screen_thresholds: [0, 0, HOUR_MS, HOUR_MS],
        }
    }
}

impl ThresholdSettings {
    /// Parse `screen_thresholds=A/B/C/D,elapsed_thresholds=E/F/G/H`.
    ///
    /// Any missing key, malformed vector, or non-monotonic entry discards
    /// the *entire* parse and returns [`ThresholdSettings::default`] — the
    /// source format gives no sensible way to salvage half a result, and a
    /// partially-applied threshold set is worse than a known-good default.
    /// Logs a single `tracing::warn!` when falling back.
    pub fn parse(raw: &str) -> ThresholdSettings {
        match try_parse(raw) {
            Some(settings) => settings,
            None => {
                warn!(raw, "malformed app idle threshold settings, using defaults");
                ThresholdSettings::default()
            }
        }
    }
}

fn try_parse(raw: &str) -> Option<ThresholdSettings> {
    let mut elapsed = None;
    let mut screen = None;

    for field in raw.split(',') {
        let field = field.trim();
        if let Some(v) = field.strip_prefix("elapsed_thresholds=") {
            elapsed = Some(parse_vector(v)?);
        } else if let Some(v) = field.strip_prefix("screen_thresholds=") {
            screen = Some(parse_vector(v)?);
        }
    }

    Some(ThresholdSettings {
        elapsed_thresholds: elapsed?,
        screen_thresholds: screen?,
    })
}

fn parse_vector(raw: &str) -> Option<[u64; 4]> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut out = [0u64; 4];
    for (i, p) in parts.iter().enumerate() {
        out[i] = p.trim().parse().ok()?;
    }
    if out.windows(2).any(|w| w[0] > w[1]) {
        return None;
    }
    Some(out)
}
