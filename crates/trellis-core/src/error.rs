#![forbid(unsafe_code)]

//! Error and warning taxonomy.

use std::fmt;

use thiserror::Error;

use crate::id::{ModelId, RootId, ViewId};

pub type Result<T> = std::result::Result<T, Error>;

/// Axis named in bounds and overlap diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Row => "row",
            Self::Column => "column",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// No registered pane kind can render the value.
    #[error("no pane kind can render value of type `{type_name}`")]
    Resolution { type_name: String },

    /// A pane kind declared dynamic priority but answered `applies` with a
    /// bare `Yes` instead of a score.
    #[error("pane kind `{kind}` has dynamic priority but returned no score from applies")]
    Registration { kind: &'static str },

    /// Structural index out of range.
    #[error("index {index} out of range for container of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Grid target outside the declared bounds, or an empty region.
    #[error("{axis} range {start}..{end} is out of bounds (limit {limit})")]
    Bounds {
        axis: Axis,
        start: usize,
        end: usize,
        limit: usize,
    },

    /// Grid assignment overlaps existing entries under the `error` policy.
    #[error("region {region} overlaps {count} existing object(s):\n{detail}")]
    Overlap {
        region: String,
        count: usize,
        detail: String,
    },

    /// The same view was inserted twice into one container.
    #[error("{view} already appears in this container")]
    DuplicateChild { view: ViewId },

    /// A child kept requesting rerender for the same position.
    #[error("child at index {index} requested rerender more than {limit} time(s)")]
    RerenderLoop { index: usize, limit: u32 },

    #[error("unknown {0}")]
    UnknownRoot(RootId),

    #[error("{model} does not exist in document for {root}")]
    MissingModel { root: RootId, model: ModelId },

    /// Failure raised by a pane kind while building its model.
    #[error("render failed for `{kind}`: {message}")]
    Render { kind: &'static str, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    #[must_use]
    pub fn render(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Render {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn resolution(type_name: impl Into<String>) -> Self {
        Self::Resolution {
            type_name: type_name.into(),
        }
    }
}

/// Non-fatal conditions. These are logged through `tracing` and collected by
/// the caller that triggered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Grid assignment replaced overlapping entries under the `warn` policy.
    Overlap { region: String, replaced: usize },
    /// An in-place model replacement could not find the old model among its
    /// parent's children; the update was skipped.
    ReplacementRace {
        root: RootId,
        parent: ModelId,
        model: ModelId,
    },
    /// The deferred queue of a busy root reached its capacity. Queued
    /// entries are superseded by a full refresh of the root.
    DeferredOverflow { root: RootId, queued: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap { region, replaced } => write!(
                f,
                "region {region} overlapped {replaced} existing object(s); they were replaced"
            ),
            Self::ReplacementRace {
                root,
                parent,
                model,
            } => write!(
                f,
                "{model} is no longer a child of {parent} in {root}; update skipped"
            ),
            Self::DeferredOverflow { root, queued } => write!(
                f,
                "deferred queue for {root} overflowed at {queued} entries; refreshing the whole root"
            ),
        }
    }
}
