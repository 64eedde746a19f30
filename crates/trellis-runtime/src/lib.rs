#![forbid(unsafe_code)]

//! Trellis runtime.
//!
//! Concrete views and the machinery that keeps their models current:
//!
//! - [`Pane`] wraps one application value in the kind the registry picks
//!   for it; [`kinds`] holds the built-in kinds.
//! - List layouts ([`ListPanel`], [`GridBox`], [`Card`]) and named layouts
//!   ([`Tabs`], [`Accordion`]) own their children and expose all-or-nothing
//!   mutators through [`ListLayout`] and [`NamedLayout`].
//! - [`GridSpec`] places children on rectangular regions of a sparse grid.
//! - [`reconcile`] brings a container's child models up to date, reusing
//!   whatever survived.
//! - [`Session`] owns one document per root and routes view changes and
//!   client events.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_runtime::{ListLayout, ListPanel, Session};
//!
//! let column = ListPanel::column(["# Title", "body"])?;
//! let session = Session::new();
//! let root = session.add_root(&column.view())?;
//! column.append("footer")?;
//! println!("{}", session.snapshot(root)?);
//! ```

pub mod accordion;
mod base;
pub mod card;
pub mod config;
pub mod grid_box;
pub mod grid_spec;
pub mod kinds;
pub mod layout;
pub mod list;
pub mod named;
pub mod pane;
mod reconcile;
pub mod session;
pub mod tabs;

pub use accordion::Accordion;
pub use card::Card;
pub use config::{ConfigError, GridConfig, ReconcileConfig, SessionConfig, TrellisConfig};
pub use grid_box::GridBox;
pub use grid_spec::GridSpec;
pub use kinds::{default_registry, register_builtin};
pub use layout::{ListKind, ListPanel};
pub use list::{ListLayout, ObjectList};
pub use named::{NamedChild, NamedLayout, NamedList};
pub use pane::{Pane, coerce, coerce_with_hints, panel};
pub use reconcile::reconcile;
pub use session::Session;
pub use tabs::Tabs;
