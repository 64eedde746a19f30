#![forbid(unsafe_code)]

//! Trellis core.
//!
//! Shared vocabulary of the workspace: identifiers, application [`Value`]s,
//! the in-process model [`Document`], the [`PaneRegistry`] used to resolve
//! values to pane kinds, and the [`Viewable`] contract every pane and layout
//! implements.
//!
//! # Role in Trellis
//! `trellis-core` has no opinion about layouts or sessions. `trellis-layout`
//! builds pure grid algorithms on top of it and `trellis-runtime` implements
//! panes, containers, the reconciler and the root registry.

pub mod document;
pub mod error;
pub mod id;
pub mod registry;
pub mod value;
pub mod view;
pub mod watch;

pub use document::{Document, ModelData, Props};
pub use error::{Axis, Error, Result, Warning};
pub use id::{ModelId, RootId, ViewId};
pub use registry::{
    Applies, BuildStep, MAX_CONVERSION_DEPTH, PaneKind, PaneRegistry, PaneRegistryBuilder,
    Resolved,
};
pub use value::{CustomValue, Hints, Value};
pub use view::{
    Change, Child, PassStats, RenderContext, RenderRecord, RenderRecords, RenderStep, View,
    Viewable,
};
pub use watch::{Watch, Watchers};
