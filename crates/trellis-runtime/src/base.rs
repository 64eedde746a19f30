#![forbid(unsafe_code)]

//! State shared by every concrete view: identity, a weak handle to itself
//! for change notification, render records, watchers and, for containers,
//! the children last rendered into each root.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use trellis_core::{
    Change, ModelId, Props, RenderContext, RenderRecords, RenderStep, Result, RootId, View,
    ViewId, Viewable, Watchers,
};

use crate::reconcile::reconcile;

pub(crate) struct ViewBase {
    pub(crate) id: ViewId,
    me: Weak<dyn Viewable>,
    pub(crate) records: RenderRecords,
    pub(crate) watchers: Watchers,
}

impl ViewBase {
    pub(crate) fn new(me: Weak<dyn Viewable>) -> Self {
        Self {
            id: ViewId::next(),
            me,
            records: RenderRecords::new(),
            watchers: Watchers::new(),
        }
    }

    pub(crate) fn view(&self) -> Option<View> {
        self.me.upgrade().map(View::new)
    }

    /// Tell watchers about `change`.
    pub(crate) fn notify(&self, change: Change) {
        if let Some(view) = self.view() {
            self.watchers.notify(&view, &change);
        }
    }

    pub(crate) fn model(&self, root: RootId) -> Option<ModelId> {
        self.records.get(root).map(|r| r.model)
    }
}

/// [`ViewBase`] plus the per-root list of children as last reconciled.
pub(crate) struct ContainerBase {
    pub(crate) base: ViewBase,
    rendered: RefCell<BTreeMap<RootId, Vec<View>>>,
}

impl ContainerBase {
    pub(crate) fn new(me: Weak<dyn Viewable>) -> Self {
        Self {
            base: ViewBase::new(me),
            rendered: RefCell::new(BTreeMap::new()),
        }
    }

    pub(crate) fn rendered(&self, root: RootId) -> Vec<View> {
        self.rendered.borrow().get(&root).cloned().unwrap_or_default()
    }

    /// First materialization of the container and its children.
    pub(crate) fn render(
        &self,
        cx: &mut RenderContext<'_>,
        parent: Option<ModelId>,
        kind: &str,
        props: Props,
        children: &[View],
    ) -> Result<RenderStep> {
        let root = cx.root();
        if self.base.records.contains(root) {
            // Stale render for this root; tear it down fully first.
            self.cleanup(cx);
        }
        let model = cx.create_model(self.base.id, &self.base.records, kind, props, parent);
        match reconcile(cx, model, children, &[]) {
            Ok(models) => {
                cx.doc().set_children(model, models);
                self.rendered.borrow_mut().insert(root, children.to_vec());
                Ok(RenderStep::Model(model))
            }
            Err(err) => {
                cx.release_record(self.base.id, &self.base.records);
                Err(err)
            }
        }
    }

    /// Bring children and properties of this root's model up to date.
    pub(crate) fn sync(&self, cx: &mut RenderContext<'_>, props: Props, children: &[View]) -> Result<()> {
        let root = cx.root();
        let Some(model) = self.base.model(root) else {
            return Ok(());
        };
        let old = self.rendered(root);
        let models = reconcile(cx, model, children, &old)?;
        cx.doc().set_children(model, models);
        cx.doc().update_props(model, props);
        self.rendered.borrow_mut().insert(root, children.to_vec());
        Ok(())
    }

    pub(crate) fn update_props(&self, cx: &mut RenderContext<'_>, props: Props) {
        if let Some(model) = self.base.model(cx.root()) {
            cx.doc().update_props(model, props);
        }
    }

    /// Release every child rendered into this root, then the container.
    pub(crate) fn cleanup(&self, cx: &mut RenderContext<'_>) {
        let root = cx.root();
        let children = self.rendered.borrow_mut().remove(&root).unwrap_or_default();
        for child in &children {
            child.cleanup(cx);
        }
        cx.release_record(self.base.id, &self.base.records);
    }

    pub(crate) fn apply_change(
        &self,
        cx: &mut RenderContext<'_>,
        change: &Change,
        props: Props,
        children: &[View],
    ) -> Result<()> {
        match change {
            Change::Objects => self.sync(cx, props, children),
            Change::Object | Change::Property(_) => {
                self.update_props(cx, props);
                Ok(())
            }
        }
    }
}

/// Reject a child list that holds the same view twice.
pub(crate) fn ensure_unique(children: &[View]) -> Result<()> {
    let mut seen = rustc_hash::FxHashSet::default();
    for child in children {
        if !seen.insert(child.id()) {
            return Err(trellis_core::Error::DuplicateChild { view: child.id() });
        }
    }
    Ok(())
}

pub(crate) fn default_label(type_name: &str, id: ViewId) -> String {
    format!("{type_name}{:05}", id.get())
}

/// Wrap `value` in an `Rc` whose contents can reach their own handle.
pub(crate) fn new_cyclic<T: Viewable>(build: impl FnOnce(Weak<dyn Viewable>) -> T) -> Rc<T> {
    Rc::new_cyclic(|weak: &Weak<T>| {
        let me: Weak<dyn Viewable> = weak.clone();
        build(me)
    })
}
