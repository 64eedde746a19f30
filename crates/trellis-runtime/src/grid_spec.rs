#![forbid(unsafe_code)]

//! GridSpec: sparse grid with rectangular slice assignment.
//!
//! ```rust,ignore
//! let spec = GridSpec::new();
//! spec.assign(0..2, 0..2, "header")?;
//! spec.assign(2.., .., plot)?;
//! ```
//!
//! Overlapping assignments follow the configured [`OverlapMode`]; see
//! [`trellis_layout::span`] for the exact replacement order.

use std::cell::RefCell;
use std::fmt;
use std::ops::RangeBounds;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;
use trellis_core::{
    Change, Child, Error, ModelId, PaneRegistry, Props, RenderContext, RenderRecords, RenderStep,
    Result, View, ViewId, Viewable, Warning, Watchers,
};
use trellis_layout::{OverlapMode, Span, SpanGrid};

use crate::base::{ContainerBase, default_label, new_cyclic};
use crate::config::TrellisConfig;
use crate::kinds::default_registry;
use crate::pane::coerce;

pub struct GridSpec {
    container: ContainerBase,
    grid: RefCell<SpanGrid<View>>,
    registry: Arc<PaneRegistry>,
}

impl GridSpec {
    /// Unbounded grid with the default overlap policy.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Self::with_options(default_registry(), None, None, OverlapMode::default())
    }

    /// Grid whose overlap policy comes from `config`.
    #[must_use]
    pub fn from_config(config: &TrellisConfig) -> Rc<Self> {
        Self::with_options(default_registry(), None, None, config.grid.overlap_mode)
    }

    /// Grid with fixed row and/or column counts.
    #[must_use]
    pub fn fixed(nrows: Option<usize>, ncols: Option<usize>, mode: OverlapMode) -> Rc<Self> {
        Self::with_options(default_registry(), nrows, ncols, mode)
    }

    #[must_use]
    pub fn with_options(
        registry: Arc<PaneRegistry>,
        nrows: Option<usize>,
        ncols: Option<usize>,
        mode: OverlapMode,
    ) -> Rc<Self> {
        new_cyclic(|me| Self {
            container: ContainerBase::new(me),
            grid: RefCell::new(SpanGrid::new(nrows, ncols, mode)),
            registry,
        })
    }

    #[must_use]
    pub fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }

    #[must_use]
    pub fn mode(&self) -> OverlapMode {
        self.grid.borrow().mode()
    }

    pub fn set_mode(&self, mode: OverlapMode) {
        self.grid.borrow_mut().set_mode(mode);
        self.container.base.notify(Change::Property("mode"));
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.grid.borrow().nrows()
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.grid.borrow().ncols()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grid.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid.borrow().is_empty()
    }

    /// Assign `child` to the region `rows x cols`.
    ///
    /// Returns the overlap warning, if the `warn` policy replaced entries.
    pub fn assign(
        &self,
        rows: impl RangeBounds<usize>,
        cols: impl RangeBounds<usize>,
        child: impl Into<Child>,
    ) -> Result<Option<Warning>> {
        let span = self.grid.borrow().resolve_region(rows, cols)?;
        let view = coerce(&self.registry, child.into())?;
        let outcome = {
            let mut grid = self.grid.borrow_mut();
            // The same view may only occupy one region at a time.
            if grid
                .entries()
                .iter()
                .any(|(s, v)| v.ptr_eq(&view) && !s.intersects(&span))
            {
                return Err(Error::DuplicateChild { view: view.id() });
            }
            grid.assign(span, view)?
        };
        if let Some(warning) = &outcome.warning {
            tracing::warn!(grid = %self.container.base.id, "{warning}");
        }
        self.container.base.notify(Change::Objects);
        Ok(outcome.warning)
    }

    /// Views whose region intersects `rows x cols`, in insertion order.
    pub fn get_region(
        &self,
        rows: impl RangeBounds<usize>,
        cols: impl RangeBounds<usize>,
    ) -> Result<Vec<View>> {
        let grid = self.grid.borrow();
        let span = grid.resolve_region(rows, cols)?;
        Ok(grid.get_region(span).map(|(_, v)| v.clone()).collect())
    }

    /// The view covering cell `(row, col)`.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<View> {
        self.grid.borrow().cell(row, col).map(|(_, v)| v.clone())
    }

    /// Region currently held by `view`.
    #[must_use]
    pub fn span_of(&self, view: &View) -> Option<Span> {
        self.grid
            .borrow()
            .entries()
            .iter()
            .find(|(_, v)| v.ptr_eq(view))
            .map(|(s, _)| *s)
    }

    /// Delete every entry intersecting `rows x cols`.
    pub fn remove_region(
        &self,
        rows: impl RangeBounds<usize>,
        cols: impl RangeBounds<usize>,
    ) -> Result<Vec<View>> {
        let removed = {
            let mut grid = self.grid.borrow_mut();
            let span = grid.resolve_region(rows, cols)?;
            grid.remove_region(span)
        };
        if !removed.is_empty() {
            self.container.base.notify(Change::Objects);
        }
        Ok(removed.into_iter().map(|(_, v)| v).collect())
    }

    /// Remove `view` wherever it is placed.
    pub fn remove(&self, view: &View) -> bool {
        let removed = self.grid.borrow_mut().remove_where(|v| v.ptr_eq(view));
        if removed.is_empty() {
            return false;
        }
        self.container.base.notify(Change::Objects);
        true
    }

    pub fn clear(&self) -> Vec<View> {
        let removed = self.grid.borrow_mut().clear();
        if !removed.is_empty() {
            self.container.base.notify(Change::Objects);
        }
        removed.into_iter().map(|(_, v)| v).collect()
    }

    /// Per-cell coverage counts.
    #[must_use]
    pub fn occupancy(&self) -> Vec<Vec<u32>> {
        self.grid.borrow().occupancy()
    }

    /// Copy with the same bounds and policy, keeping every placement
    /// (children shared by identity) or starting from an empty grid.
    #[must_use]
    pub fn clone_with(&self, keep_objects: bool) -> Rc<Self> {
        let grid = self.grid.borrow();
        let copy = Self::with_options(
            Arc::clone(&self.registry),
            grid.fixed_rows(),
            grid.fixed_cols(),
            grid.mode(),
        );
        if keep_objects {
            *copy.grid.borrow_mut() = grid.clone();
        }
        copy
    }

    fn children(&self) -> Vec<View> {
        self.grid
            .borrow()
            .entries()
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn props(&self) -> Props {
        let grid = self.grid.borrow();
        let positions: Vec<serde_json::Value> = grid
            .entries()
            .iter()
            .map(|(s, _)| json!([s.row_start, s.col_start, s.rows(), s.cols()]))
            .collect();
        let mut props = Props::new();
        props.insert("name".into(), json!(self.label()));
        props.insert("nrows".into(), json!(grid.nrows()));
        props.insert("ncols".into(), json!(grid.ncols()));
        props.insert("mode".into(), json!(grid.mode().as_str()));
        props.insert("positions".into(), serde_json::Value::Array(positions));
        props
    }
}

impl Viewable for GridSpec {
    fn id(&self) -> ViewId {
        self.container.base.id
    }

    fn type_name(&self) -> &'static str {
        "GridSpec"
    }

    fn label(&self) -> String {
        default_label("GridSpec", self.container.base.id)
    }

    fn records(&self) -> &RenderRecords {
        &self.container.base.records
    }

    fn watchers(&self) -> &Watchers {
        &self.container.base.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        self.container
            .render(cx, parent, "GridSpec", self.props(), &self.children())
    }

    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()> {
        self.container
            .apply_change(cx, change, self.props(), &self.children())
    }

    fn cleanup(&self, cx: &mut RenderContext<'_>) {
        self.container.cleanup(cx);
    }

    fn objects(&self) -> Vec<View> {
        self.children()
    }
}

impl fmt::Debug for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = self.grid.borrow();
        f.debug_struct("GridSpec")
            .field("id", &self.container.base.id)
            .field("nrows", &grid.nrows())
            .field("ncols", &grid.ncols())
            .field("mode", &grid.mode())
            .field("entries", &grid.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::Pane;

    #[test]
    fn error_mode_keeps_existing_entry() {
        let spec = GridSpec::fixed(None, None, OverlapMode::Error);
        let x = Pane::new("x").expect("pane").view();
        spec.assign(0..2, 0..2, &x).expect("first");
        let err = spec.assign(1..3, 1..3, "y").err().expect("overlap");
        assert!(matches!(err, Error::Overlap { count: 1, .. }));
        assert_eq!(spec.cell(1, 1), Some(x.clone()));
        assert_eq!(spec.span_of(&x), Span::new(0, 0, 2, 2).ok());
        assert_eq!((spec.nrows(), spec.ncols()), (2, 2));
    }

    #[test]
    fn override_mode_removes_overlapped_entry() {
        let spec = GridSpec::fixed(None, None, OverlapMode::Override);
        let x = Pane::new("x").expect("pane").view();
        spec.assign(0..2, 0..2, &x).expect("first");
        let warning = spec.assign(1..3, 1..3, "y").expect("replaces");
        assert!(warning.is_none());
        assert_eq!(spec.span_of(&x), None);
        assert_eq!(spec.len(), 1);
        assert!(spec.get_region(0..1, 0..1).expect("region").is_empty());
    }

    #[test]
    fn warn_mode_returns_warning() {
        let spec = GridSpec::new();
        spec.assign(0..1, 0..1, "a").expect("assign");
        let warning = spec.assign(0..1, 0..2, "b").expect("replaces");
        assert!(matches!(warning, Some(Warning::Overlap { replaced: 1, .. })));
    }

    #[test]
    fn same_view_in_disjoint_regions_is_rejected() {
        let spec = GridSpec::new();
        let a = Pane::new("a").expect("pane").view();
        spec.assign(0..1, 0..1, &a).expect("assign");
        let err = spec.assign(1..2, 1..2, &a).err().expect("duplicate");
        assert!(matches!(err, Error::DuplicateChild { .. }));
        // Moving it over its own region is a replacement.
        spec.assign(0..2, 0..2, &a).expect("grow in place");
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn fixed_bounds_and_open_ranges() {
        let spec = GridSpec::fixed(Some(3), Some(4), OverlapMode::Error);
        assert!(matches!(spec.assign(2..4, 0..1, "x"), Err(Error::Bounds { .. })));
        spec.assign(.., 0..1, "left").expect("full height");
        spec.assign(0..1, 1.., "top").expect("rest of first row");
        assert_eq!(spec.occupancy()[0], vec![1, 1, 1, 1]);
        assert_eq!(spec.occupancy()[2], vec![1, 0, 0, 0]);
        let removed = spec.remove_region(0..1, 3..4).expect("remove");
        assert_eq!(removed.len(), 1);
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn config_sets_overlap_mode() {
        let mut config = TrellisConfig::default();
        config.grid.overlap_mode = OverlapMode::Error;
        assert_eq!(GridSpec::from_config(&config).mode(), OverlapMode::Error);
    }
}
