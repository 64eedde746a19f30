#![forbid(unsafe_code)]

//! Grid algorithms for Trellis layouts.
//!
//! Two independent structures live here:
//!
//! - [`flatten`]: nested row/column trees to a uniform grid of positioned
//!   cells, aligning sibling branches on the LCM of their extents.
//! - [`span`]: the sparse rectangle map behind indexed grid assignment, with
//!   a configurable overlap policy.
//!
//! Both are pure data structures. Rendering and change notification live in
//! `trellis-runtime`.

pub mod flatten;
pub mod span;

pub use flatten::{FlatGrid, GridCell, GridNode, Nested, flatten, flatten_grid};
pub use span::{Assignment, OverlapMode, Span, SpanGrid};
