use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique id of the form `<prefix>-<n>`.
pub fn unique_id(prefix: &str) -> String {
    let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{n}")
}

/// Identity of the component that initiated a state change.
///
/// Every mutation that ends in a broadcast carries the token of its
/// originator. Subscribers compare the received token with their own and
/// skip events they caused themselves; the event bus never does this.
///
/// Tokens compare by their numeric identity only; the label is for logs.
#[derive(Debug, Clone, Serialize)]
pub struct OriginToken {
    raw: u64,
    label: String,
}

impl OriginToken {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            raw: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
        }
    }

    /// Token for changes that do not come from a chart (loaders, tools).
    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }
}

impl PartialEq for OriginToken {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for OriginToken {}

impl std::hash::Hash for OriginToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for OriginToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.raw)
    }
}
