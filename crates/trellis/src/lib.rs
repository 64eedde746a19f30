#![forbid(unsafe_code)]

//! Trellis public facade crate.
//!
//! Re-exports the types most applications need from the internal crates
//! and offers a prelude for day-to-day usage.
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//!
//! let tabs = Tabs::new([("Intro", "# Hello"), ("Data", "1, 2, 3")])?;
//! let session = Session::new();
//! let root = session.add_root(&tabs.view())?;
//! tabs.append(("More", "another pane"))?;
//! println!("{}", session.snapshot(root)?);
//! ```

// --- Core re-exports -------------------------------------------------------

pub use trellis_core::{
    Applies, BuildStep, Change, Child, CustomValue, Document, Error, Hints, ModelId, PaneKind,
    PaneRegistry, PaneRegistryBuilder, Props, RenderContext, RenderStep, Result, RootId, Value,
    View, ViewId, Viewable, Warning,
};

// --- Layout re-exports -----------------------------------------------------

pub use trellis_layout::{FlatGrid, GridCell, Nested, OverlapMode, Span, flatten};

// --- Runtime re-exports ----------------------------------------------------

pub use trellis_runtime::{
    Accordion, Card, GridBox, GridSpec, ListKind, ListLayout, ListPanel, NamedChild, NamedLayout,
    Pane, Session, Tabs, TrellisConfig, default_registry, panel,
};

// --- Logging ---------------------------------------------------------------

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g. `"trellis=debug"`)
/// is used. Returns `false` if a global subscriber was already installed.
#[cfg(feature = "logging")]
pub fn init_logging(default_filter: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Accordion, Card, Change, Child, Error, GridBox, GridSpec, ListLayout, ListPanel,
        NamedLayout, OverlapMode, Pane, Result, Session, Tabs, Value, View, Viewable, panel,
    };

    pub use crate::{core, layout, runtime};
}

pub use trellis_core as core;
pub use trellis_layout as layout;
pub use trellis_runtime as runtime;
