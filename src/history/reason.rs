use serde::{Deserialize, Serialize};

/// The source that most recently assigned a history's current bucket.
///
/// Arbitration between sources is the 5×5 acceptance matrix implemented as a
/// `match` in [`crate::policy::precedence_allows`], not an indexed table —
/// this enum carries no ordering of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonKind {
    Default,
    Usage,
    Timeout,
    Predicted,
    Forced,
}

/// A reason, with an optional diagnostic subtag (e.g. `PREDICTED:CTS`).
///
/// The subtag is compared for equality by tests but never inspected by
/// policy — see the open question in SPEC_FULL.md §9.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub kind: ReasonKind,
    pub subtag: Option<String>,
}

impl Reason {
    pub fn new(kind: ReasonKind) -> Self {
        Self { kind, subtag: None }
    }

    pub fn with_subtag(kind: ReasonKind, subtag: impl Into<String>) -> Self {
        Self {
            kind,
            subtag: Some(subtag.into()),
        }
    }

    pub const fn default_reason() -> Self {
        Self {
            kind: ReasonKind::Default,
            subtag: None,
        }
    }

    pub const fn usage() -> Self {
        Self {
            kind: ReasonKind::Usage,
            subtag: None,
        }
    }

    pub const fn timeout() -> Self {
        Self {
            kind: ReasonKind::Timeout,
            subtag: None,
        }
    }

    pub const fn forced() -> Self {
        Self {
            kind: ReasonKind::Forced,
            subtag: None,
        }
    }

    pub const fn predicted() -> Self {
        Self {
            kind: ReasonKind::Predicted,
            subtag: None,
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subtag {
            Some(tag) => write!(f, "{:?}:{tag}", self.kind),
            None => write!(f, "{:?}", self.kind),
        }
    }
}
