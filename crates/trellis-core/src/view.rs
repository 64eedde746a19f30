#![forbid(unsafe_code)]

//! The rendering contract shared by panes and layouts.
//!
//! # Design
//!
//! Every renderable object implements [`Viewable`] and is handled through a
//! reference-counted [`View`]. Identity is the [`ViewId`] allocated at
//! construction: cloning a `View` yields the same object, constructing a new
//! pane yields a new identity even for an equal value.
//!
//! Each view keeps [`RenderRecords`], one `(model, parent_model)` pair per
//! root it is currently rendered into. A render pass for one root runs with a
//! [`RenderContext`] that owns mutable access to that root's
//! [`Document`] plus the pass-scoped bookkeeping (released views, warnings,
//! counters). Nothing about a pass lives in shared or global state.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::document::Document;
use crate::error::{Result, Warning};
use crate::id::{ModelId, RootId, ViewId};
use crate::value::Value;
use crate::watch::Watchers;

/// Where a view is rendered in one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRecord {
    pub model: ModelId,
    /// `None` only for the root-level model.
    pub parent: Option<ModelId>,
}

/// Per-root render records of one view, iterated in root order.
#[derive(Debug, Default)]
pub struct RenderRecords {
    records: RefCell<BTreeMap<RootId, RenderRecord>>,
}

impl RenderRecords {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, root: RootId) -> Option<RenderRecord> {
        self.records.borrow().get(&root).copied()
    }

    /// Insert or overwrite the record for `root`, returning the previous one.
    pub fn insert(&self, root: RootId, record: RenderRecord) -> Option<RenderRecord> {
        self.records.borrow_mut().insert(root, record)
    }

    pub fn remove(&self, root: RootId) -> Option<RenderRecord> {
        self.records.borrow_mut().remove(&root)
    }

    #[must_use]
    pub fn contains(&self, root: RootId) -> bool {
        self.records.borrow().contains_key(&root)
    }

    /// Roots this view is rendered into.
    #[must_use]
    pub fn roots(&self) -> Vec<RootId> {
        self.records.borrow().keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

/// Outcome of rendering one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStep {
    Model(ModelId),
    /// The siblings rendered before this view in the current pass are stale
    /// and must be discarded and rendered again.
    Rerender,
}

/// What changed on a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The wrapped value of a pane.
    Object,
    /// The child sequence of a layout.
    Objects,
    /// A named parameter (names, active, collapsed, ...).
    Property(&'static str),
}

/// Counters accumulated over one pass, reported on the reconcile span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub rendered: u64,
    pub reused: u64,
    pub released: u64,
    pub restarts: u64,
}

/// Pass-scoped state for rendering into one root.
pub struct RenderContext<'a> {
    doc: &'a mut Document,
    max_restarts: u32,
    released: Vec<ViewId>,
    warnings: Vec<Warning>,
    stats: PassStats,
}

impl<'a> RenderContext<'a> {
    #[must_use]
    pub fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            max_restarts: 1,
            released: Vec::new(),
            warnings: Vec::new(),
            stats: PassStats::default(),
        }
    }

    /// Maximum restarts a single child position may request per pass.
    #[must_use]
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts.max(1);
        self
    }

    #[must_use]
    pub fn root(&self) -> RootId {
        self.doc.root_id()
    }

    #[must_use]
    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    pub fn doc(&mut self) -> &mut Document {
        &mut *self.doc
    }

    #[must_use]
    pub fn doc_ref(&self) -> &Document {
        &*self.doc
    }

    /// Create a model owned by `view` and record it for this root.
    pub fn create_model(
        &mut self,
        view: ViewId,
        records: &RenderRecords,
        kind: &str,
        props: crate::document::Props,
        parent: Option<ModelId>,
    ) -> ModelId {
        let root = self.root();
        if let Some(stale) = records.get(root) {
            self.doc.remove(stale.model);
        }
        let model = self.doc.create(kind, props, parent);
        self.doc.bind(model, view);
        records.insert(root, RenderRecord { model, parent });
        self.stats.rendered += 1;
        model
    }

    /// Swap `view`'s model for this root with a fresh one, splicing it into
    /// the parent's child list at the old model's position.
    ///
    /// If the old model is no longer among its parent's children the swap is
    /// skipped, a [`Warning::ReplacementRace`] is recorded and `None` is
    /// returned.
    pub fn replace_model(
        &mut self,
        view: ViewId,
        records: &RenderRecords,
        kind: &str,
        props: crate::document::Props,
    ) -> Option<ModelId> {
        let root = self.root();
        let old = records.get(root)?;
        if let Some(parent) = old.parent
            && !self.doc.children(parent).contains(&old.model)
        {
            self.warn(Warning::ReplacementRace {
                root,
                parent,
                model: old.model,
            });
            return None;
        }
        let model = self.doc.create(kind, props, old.parent);
        self.doc.bind(model, view);
        match old.parent {
            Some(parent) => {
                self.doc.replace_child(parent, old.model, model);
            }
            None if self.doc.root_model() == Some(old.model) => {
                self.doc.set_root_model(Some(model));
            }
            None => {}
        }
        self.doc.remove(old.model);
        records.insert(
            root,
            RenderRecord {
                model,
                parent: old.parent,
            },
        );
        self.stats.rendered += 1;
        Some(model)
    }

    /// Drop `view`'s record for this root and remove its model.
    ///
    /// Returns the released record, or `None` if the view was not rendered
    /// here (release is idempotent).
    pub fn release_record(&mut self, view: ViewId, records: &RenderRecords) -> Option<RenderRecord> {
        let record = records.remove(self.root())?;
        self.doc.remove(record.model);
        self.released.push(view);
        self.stats.released += 1;
        Some(record)
    }

    pub fn note_reused(&mut self) {
        self.stats.reused += 1;
    }

    pub fn note_restart(&mut self) {
        self.stats.restarts += 1;
    }

    /// Record and log a non-fatal condition.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(root = %self.root(), "{warning}");
        self.warnings.push(warning);
    }

    #[must_use]
    pub fn stats(&self) -> PassStats {
        self.stats
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Views released during this pass, in release order.
    #[must_use]
    pub fn released(&self) -> &[ViewId] {
        &self.released
    }

    /// Consume the context, returning released views and warnings.
    #[must_use]
    pub fn finish(self) -> (Vec<ViewId>, Vec<Warning>) {
        (self.released, self.warnings)
    }
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("root", &self.root())
            .field("stats", &self.stats)
            .field("warnings", &self.warnings.len())
            .finish_non_exhaustive()
    }
}

/// Something that can be materialized into a model tree.
pub trait Viewable: Any {
    fn id(&self) -> ViewId;

    /// Type tag used in diagnostics (`"Pane"`, `"Column"`, ...).
    fn type_name(&self) -> &'static str;

    /// Advertised display name (used e.g. as a tab title).
    fn label(&self) -> String;

    fn records(&self) -> &RenderRecords;

    fn watchers(&self) -> &Watchers;

    /// Materialize this view for the context's root.
    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep>;

    /// Bring this root's model up to date after `change`.
    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()>;

    /// Release this view (and everything it rendered) for the context's root.
    fn cleanup(&self, cx: &mut RenderContext<'_>);

    /// User-facing children, walked by [`View::select`].
    fn objects(&self) -> Vec<View> {
        Vec::new()
    }

    /// Children as they appear in the model tree. Differs from
    /// [`Viewable::objects`] when a layout wraps its objects (accordion cards).
    fn render_children(&self) -> Vec<View> {
        self.objects()
    }

    /// Property change coming back from the client side.
    fn on_client_change(&self, _name: &str, _value: &serde_json::Value) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to a [`Viewable`].
#[derive(Clone)]
pub struct View(Rc<dyn Viewable>);

impl View {
    #[must_use]
    pub fn new(inner: Rc<dyn Viewable>) -> Self {
        Self(inner)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }

    /// Recover the concrete type behind the handle.
    #[must_use]
    pub fn downcast<T: Viewable>(&self) -> Option<Rc<T>> {
        let any: Rc<dyn Any> = self.0.clone();
        any.downcast::<T>().ok()
    }

    #[must_use]
    pub fn is<T: Viewable>(&self) -> bool {
        let any: &dyn Any = &*self.0;
        any.is::<T>()
    }

    /// Depth-first walk returning this view and every descendant matching
    /// `predicate`, in pre-order.
    pub fn select(&self, predicate: &dyn Fn(&View) -> bool) -> Vec<View> {
        let mut out = Vec::new();
        self.select_into(predicate, &mut out);
        out
    }

    fn select_into(&self, predicate: &dyn Fn(&View) -> bool, out: &mut Vec<View>) {
        if predicate(self) {
            out.push(self.clone());
        }
        for child in self.0.objects() {
            child.select_into(predicate, out);
        }
    }

    /// Every view in the rendered tree below (and including) this one.
    #[must_use]
    pub fn render_tree(&self) -> Vec<View> {
        let mut out = vec![self.clone()];
        let mut idx = 0;
        while idx < out.len() {
            let children = out[idx].0.render_children();
            out.extend(children);
            idx += 1;
        }
        out
    }

    /// Render this view as the top-level model of the context's root.
    ///
    /// A top-level rerender request is retried up to the context's restart
    /// limit.
    pub fn get_root(&self, cx: &mut RenderContext<'_>) -> Result<ModelId> {
        let mut attempts = 0;
        loop {
            match self.0.render(cx, None)? {
                RenderStep::Model(model) => {
                    cx.doc().set_root_model(Some(model));
                    return Ok(model);
                }
                RenderStep::Rerender => {
                    attempts += 1;
                    cx.note_restart();
                    if attempts > cx.max_restarts() {
                        return Err(crate::Error::RerenderLoop {
                            index: 0,
                            limit: cx.max_restarts(),
                        });
                    }
                }
            }
        }
    }
}

impl std::ops::Deref for View {
    type Target = dyn Viewable;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for View {}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.0.type_name(), self.0.id())
    }
}

/// Anything a layout accepts as a child: an existing view, or a raw value
/// still to be resolved into a pane.
#[derive(Debug, Clone)]
pub enum Child {
    View(View),
    Value(Value),
}

impl From<View> for Child {
    fn from(view: View) -> Self {
        Self::View(view)
    }
}

impl From<&View> for Child {
    fn from(view: &View) -> Self {
        Self::View(view.clone())
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

macro_rules! child_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Child {
                fn from(v: $ty) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

child_from_value!(bool, i32, i64, u32, f32, f64, String, &str, serde_json::Value);
