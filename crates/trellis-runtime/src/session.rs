#![forbid(unsafe_code)]

//! Root registry and change dispatch.
//!
//! A [`Session`] owns the [`Document`] of every root it renders and
//! subscribes to every view currently rendered in any of them. When a view
//! reports a change, each root holding a record for that view is updated:
//!
//! - immediately, if the root's document is idle;
//! - otherwise the change is queued on that root and applied, in FIFO
//!   order, as soon as the work holding the document finishes.
//!
//! Applying a change reads the view's current state, so a change already
//! queued for the same view is not queued twice; it keeps its place. The
//! queue holds at most `session.max_deferred` distinct entries. Past that
//! the root is marked for a full refresh, which supersedes every queued
//! entry, and [`Warning::DeferredOverflow`] is recorded. Nothing is lost.
//!
//! Failures during a dispatched update never unwind into the code that
//! changed the view. They are logged and collected; see
//! [`Session::take_errors`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};
use trellis_core::{
    Change, Document, Error, ModelId, RenderContext, Result, RootId, View, ViewId, Warning, Watch,
};

use crate::config::TrellisConfig;

static NEXT_ROOT: AtomicU64 = AtomicU64::new(1);

fn next_root() -> RootId {
    RootId::new(NEXT_ROOT.fetch_add(1, Ordering::Relaxed))
}

struct RootSlot {
    id: RootId,
    view: View,
    doc: RefCell<Document>,
    pending: RefCell<VecDeque<(View, Change)>>,
    /// Overflowed: the next drain refreshes every view of the root.
    stale: Cell<bool>,
}

struct SessionShared {
    config: TrellisConfig,
    me: Weak<SessionShared>,
    roots: RefCell<BTreeMap<RootId, Rc<RootSlot>>>,
    watches: RefCell<FxHashMap<ViewId, Watch>>,
    warnings: RefCell<Vec<Warning>>,
    errors: RefCell<Vec<Error>>,
}

/// Rendering driver: one document per root, kept in sync with the views.
pub struct Session {
    shared: Rc<SessionShared>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::build(TrellisConfig::default())
    }

    /// Session using `config`, which must validate.
    pub fn with_config(config: TrellisConfig) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(Error::Config(errors.join("; ")));
        }
        Ok(Self::build(config))
    }

    fn build(config: TrellisConfig) -> Self {
        let shared = Rc::new_cyclic(|me| SessionShared {
            config,
            me: me.clone(),
            roots: RefCell::new(BTreeMap::new()),
            watches: RefCell::new(FxHashMap::default()),
            warnings: RefCell::new(Vec::new()),
            errors: RefCell::new(Vec::new()),
        });
        Self { shared }
    }

    #[must_use]
    pub fn config(&self) -> &TrellisConfig {
        &self.shared.config
    }

    /// Render `view` into a new root and start tracking its changes.
    pub fn add_root(&self, view: &View) -> Result<RootId> {
        let id = next_root();
        let slot = Rc::new(RootSlot {
            id,
            view: view.clone(),
            doc: RefCell::new(Document::new(id)),
            pending: RefCell::new(VecDeque::new()),
            stale: Cell::new(false),
        });
        {
            let mut doc = slot.doc.borrow_mut();
            let mut cx = self.shared.context(&mut doc);
            let result = view.get_root(&mut cx);
            let (_, warnings) = cx.finish();
            self.shared.warnings.borrow_mut().extend(warnings);
            result?;
        }
        tracing::debug!(root = %id, view = %view.id(), "root added");
        self.shared.roots.borrow_mut().insert(id, slot);
        self.shared.resync();
        Ok(id)
    }

    /// Top-level model of `root`.
    pub fn get_root(&self, root: RootId) -> Result<ModelId> {
        let slot = self.shared.slot(root)?;
        let model = slot.doc.borrow().root_model();
        model.ok_or(Error::UnknownRoot(root))
    }

    /// Release everything rendered into `root` and forget it.
    pub fn cleanup(&self, root: RootId) -> Result<()> {
        let slot = self
            .shared
            .roots
            .borrow_mut()
            .remove(&root)
            .ok_or(Error::UnknownRoot(root))?;
        {
            let mut doc = slot.doc.borrow_mut();
            let mut cx = self.shared.context(&mut doc);
            slot.view.cleanup(&mut cx);
            let (released, warnings) = cx.finish();
            tracing::debug!(root = %root, released = released.len(), "root cleaned up");
            self.shared.warnings.borrow_mut().extend(warnings);
        }
        self.shared.resync();
        Ok(())
    }

    /// Route a property change reported by the client for `model` to the
    /// view that owns it.
    ///
    /// The new value is written into the model first. Changes the view makes
    /// in response are queued for this root and applied once it returns.
    pub fn receive(
        &self,
        root: RootId,
        model: ModelId,
        name: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        let slot = self.shared.slot(root)?;
        let result = {
            let Ok(mut doc) = slot.doc.try_borrow_mut() else {
                return Err(Error::render("Session", format!("{root} is busy")));
            };
            let owner = doc
                .owner(model)
                .ok_or(Error::MissingModel { root, model })?;
            doc.set_prop(model, name, value.clone());
            let view = slot
                .view
                .render_tree()
                .into_iter()
                .find(|v| v.id() == owner)
                .ok_or(Error::MissingModel { root, model })?;
            tracing::debug!(root = %root, model = %model, view = %owner, prop = name, "client change");
            view.on_client_change(name, &value)
        };
        self.shared.drain(&slot);
        self.shared.resync();
        result
    }

    /// Run `f` against the document of `root`.
    pub fn with_document<R>(&self, root: RootId, f: impl FnOnce(&Document) -> R) -> Result<R> {
        let slot = self.shared.slot(root)?;
        let doc = slot.doc.borrow();
        Ok(f(&doc))
    }

    /// JSON rendering of the whole model tree of `root`.
    pub fn snapshot(&self, root: RootId) -> Result<serde_json::Value> {
        let model = self.get_root(root)?;
        self.with_document(root, |doc| doc.snapshot(model))
    }

    #[must_use]
    pub fn roots(&self) -> Vec<RootId> {
        self.shared.roots.borrow().keys().copied().collect()
    }

    /// Number of changes queued for `root`.
    pub fn pending(&self, root: RootId) -> Result<usize> {
        Ok(self.shared.slot(root)?.pending.borrow().len())
    }

    pub fn take_warnings(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.shared.warnings.borrow_mut())
    }

    /// Errors raised while applying dispatched changes.
    pub fn take_errors(&self) -> Vec<Error> {
        std::mem::take(&mut *self.shared.errors.borrow_mut())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for root in self.roots() {
            if let Err(err) = self.cleanup(root) {
                tracing::warn!(root = %root, error = %err, "cleanup on drop failed");
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("roots", &self.roots())
            .field("watched", &self.shared.watches.borrow().len())
            .finish()
    }
}

impl SessionShared {
    fn context<'a>(&self, doc: &'a mut Document) -> RenderContext<'a> {
        RenderContext::new(doc).with_max_restarts(self.config.reconcile.max_restarts_per_child)
    }

    fn slot(&self, root: RootId) -> Result<Rc<RootSlot>> {
        self.roots
            .borrow()
            .get(&root)
            .cloned()
            .ok_or(Error::UnknownRoot(root))
    }

    /// Subscribe to every view rendered in any root and drop subscriptions
    /// of views no longer rendered anywhere.
    fn resync(&self) {
        let slots: Vec<Rc<RootSlot>> = self.roots.borrow().values().cloned().collect();
        let mut live = FxHashSet::default();
        let mut fresh = Vec::new();
        for slot in &slots {
            for view in slot.view.render_tree() {
                if live.insert(view.id()) && !self.watches.borrow().contains_key(&view.id()) {
                    fresh.push(view);
                }
            }
        }
        let dropped: Vec<Watch> = {
            let mut watches = self.watches.borrow_mut();
            let stale: Vec<ViewId> = watches.keys().filter(|id| !live.contains(*id)).copied().collect();
            stale.iter().filter_map(|id| watches.remove(id)).collect()
        };
        drop(dropped);
        for view in fresh {
            let me = self.me.clone();
            let watch = view.watchers().subscribe(move |view, change| {
                if let Some(shared) = me.upgrade() {
                    shared.on_change(view, change);
                }
            });
            self.watches.borrow_mut().insert(view.id(), watch);
        }
    }

    fn on_change(&self, view: &View, change: &Change) {
        let targets: Vec<Rc<RootSlot>> = {
            let roots = self.roots.borrow();
            view.records()
                .roots()
                .iter()
                .filter_map(|root| roots.get(root).cloned())
                .collect()
        };
        for slot in &targets {
            let applied = match slot.doc.try_borrow_mut() {
                Ok(mut doc) => {
                    self.apply(slot.id, &mut doc, view, change);
                    true
                }
                Err(_) => {
                    self.defer(slot, view.clone(), change.clone());
                    false
                }
            };
            if applied {
                self.drain(slot);
            }
        }
        if !targets.is_empty() {
            self.resync();
        }
    }

    fn defer(&self, slot: &RootSlot, view: View, change: Change) {
        if slot.stale.get() {
            return;
        }
        let mut pending = slot.pending.borrow_mut();
        if pending.iter().any(|(v, c)| v.id() == view.id() && *c == change) {
            tracing::trace!(root = %slot.id, view = %view.id(), ?change, "change already queued");
            return;
        }
        if pending.len() >= self.config.session.max_deferred {
            let warning = Warning::DeferredOverflow {
                root: slot.id,
                queued: pending.len(),
            };
            tracing::warn!(root = %slot.id, "{warning}");
            self.warnings.borrow_mut().push(warning);
            pending.clear();
            slot.stale.set(true);
            return;
        }
        tracing::debug!(root = %slot.id, view = %view.id(), ?change, queued = pending.len() + 1, "deferred change");
        pending.push_back((view, change));
    }

    /// Apply queued changes of `slot` in order until the queue is empty or
    /// the document is taken again.
    fn drain(&self, slot: &RootSlot) {
        loop {
            let Ok(mut doc) = slot.doc.try_borrow_mut() else {
                return;
            };
            if slot.stale.replace(false) {
                slot.pending.borrow_mut().clear();
                self.refresh(slot, &mut doc);
                continue;
            }
            let Some((view, change)) = slot.pending.borrow_mut().pop_front() else {
                return;
            };
            self.apply(slot.id, &mut doc, &view, &change);
        }
    }

    /// Bring every view of `slot` up to date, parents before children.
    fn refresh(&self, slot: &RootSlot, doc: &mut Document) {
        let _span = tracing::debug_span!("trellis.session.refresh", root = %slot.id).entered();
        for view in slot.view.render_tree() {
            for change in [Change::Objects, Change::Object, Change::Property("name")] {
                self.apply(slot.id, doc, &view, &change);
            }
        }
    }

    fn apply(&self, root: RootId, doc: &mut Document, view: &View, change: &Change) {
        if !view.records().contains(root) {
            return;
        }
        let _span = tracing::debug_span!(
            "trellis.session.apply",
            root = %root,
            view = %view.id(),
            change = ?change,
        )
        .entered();
        let mut cx = self.context(doc);
        let result = view.apply_change(&mut cx, change);
        let (_, warnings) = cx.finish();
        self.warnings.borrow_mut().extend(warnings);
        if let Err(err) = result {
            tracing::warn!(root = %root, view = %view.id(), error = %err, "update failed");
            self.errors.borrow_mut().push(err);
        }
    }
}
