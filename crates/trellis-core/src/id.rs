#![forbid(unsafe_code)]

//! Stable identifiers for views, roots and models.
//!
//! All identifiers are non-zero. View identifiers are allocated from a
//! process-wide counter so two live views never share one; root and model
//! identifiers are allocated by their owners ([`crate::Document`] and the
//! session layer).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a view (pane or layout).
///
/// Structural identity in the reconciler is decided by this id, never by
/// value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(u64);

impl ViewId {
    /// Allocate a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Identity of one rendering target (a browser document or session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootId(u64);

impl RootId {
    /// Lowest valid root id.
    pub const MIN: Self = Self(1);

    /// Create a root id. `0` is reserved and mapped to [`RootId::MIN`].
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        if raw == 0 { Self::MIN } else { Self(raw) }
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// Identity of a toolkit model inside one [`crate::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(u64);

impl ModelId {
    /// Wrap a raw id, e.g. one echoed back by a client.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}
