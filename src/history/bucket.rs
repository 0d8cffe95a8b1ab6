use serde::{Deserialize, Serialize};

/// A standby classification. Lower numeric value = more active.
///
/// The gaps between discriminants (10, 20, 30, 40, 50) are load-bearing: the
/// precedence rules in [`crate::policy`] compare buckets as plain integers,
/// and leaving room between them is what lets a future rank be inserted
/// without renumbering every caller that hardcodes a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Bucket {
    Active = 10,
    WorkingSet = 20,
    Frequent = 30,
    Rare = 40,
    Never = 50,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Active,
        Bucket::WorkingSet,
        Bucket::Frequent,
        Bucket::Rare,
        Bucket::Never,
    ];

    /// Reconstruct a `Bucket` from its wire/raw integer value.
    ///
    /// Used only at external boundaries (a restored snapshot, a bridged wire
    /// value) — in-process code always holds a `Bucket` directly and this
    /// path can't be reached with a bad value.
    pub fn from_raw(value: i32) -> Option<Bucket> {
        Bucket::ALL.into_iter().find(|b| *b as i32 == value)
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// One rank more idle, saturating at `Never`.
    ///
    /// Prediction-timeout demotion (§4.2) steps through ACTIVE → WORKING_SET →
    /// FREQUENT → RARE one rank at a time; it never reaches NEVER this way,
    /// matching invariant I2's ban on a PREDICTED-derived history landing on
    /// NEVER.
    pub fn demote_one_rank(self) -> Bucket {
        match self {
            Bucket::Active => Bucket::WorkingSet,
            Bucket::WorkingSet => Bucket::Frequent,
            Bucket::Frequent | Bucket::Rare | Bucket::Never => Bucket::Rare,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Bucket::Active => "ACTIVE",
            Bucket::WorkingSet => "WORKING_SET",
            Bucket::Frequent => "FREQUENT",
            Bucket::Rare => "RARE",
            Bucket::Never => "NEVER",
        };
        f.write_str(s)
    }
}
