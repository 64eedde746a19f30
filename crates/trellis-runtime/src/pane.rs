#![forbid(unsafe_code)]

//! Panes: views wrapping a single application value.
//!
//! A pane's kind is chosen once, at construction, by the registry. Changing
//! the wrapped value later keeps the kind and updates every root the pane
//! is rendered in, either by mutating the model in place or, for kinds that
//! do not support that, by swapping in a new model at the same position.
//!
//! Each root remembers the value its model was built from. Once a root
//! shows a new value, the kind is asked to release the old one there.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use trellis_core::{
    BuildStep, Change, Child, Error, Hints, ModelId, PaneKind, PaneRegistry, Props, RenderContext,
    RenderRecords, RenderStep, Resolved, Result, RootId, Value, View, ViewId, Viewable, Watchers,
};

use crate::base::{ViewBase, default_label, new_cyclic};
use crate::kinds::default_registry;

pub struct Pane {
    base: ViewBase,
    kind: Arc<dyn PaneKind>,
    object: RefCell<Value>,
    name: RefCell<String>,
    shown: RefCell<BTreeMap<RootId, Value>>,
}

impl Pane {
    /// Wrap `value` in the best built-in kind.
    pub fn new(value: impl Into<Value>) -> Result<Rc<Self>> {
        Self::resolve(&default_registry(), value.into(), &Hints::new())
    }

    /// Wrap `value` in the best kind of `registry`.
    pub fn resolve(registry: &PaneRegistry, value: Value, hints: &Hints) -> Result<Rc<Self>> {
        let kind = registry.kind_for(&value, hints)?;
        Ok(Self::with_kind(kind, value))
    }

    /// Wrap `value` in an explicit kind, skipping resolution.
    #[must_use]
    pub fn with_kind(kind: Arc<dyn PaneKind>, value: Value) -> Rc<Self> {
        new_cyclic(|me| {
            let base = ViewBase::new(me);
            let name = default_label(kind.name(), base.id);
            Self {
                base,
                kind,
                object: RefCell::new(value),
                name: RefCell::new(name),
                shown: RefCell::new(BTreeMap::new()),
            }
        })
    }

    #[must_use]
    pub fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }

    #[must_use]
    pub fn kind(&self) -> &Arc<dyn PaneKind> {
        &self.kind
    }

    #[must_use]
    pub fn object(&self) -> Value {
        self.object.borrow().clone()
    }

    /// Replace the wrapped value and propagate it to every root.
    pub fn set_object(&self, value: impl Into<Value>) {
        *self.object.borrow_mut() = value.into();
        self.base.notify(Change::Object);
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
        self.base.notify(Change::Property("name"));
    }

    /// Builder-style name override.
    #[must_use]
    pub fn named(self: Rc<Self>, name: impl Into<String>) -> Rc<Self> {
        *self.name.borrow_mut() = name.into();
        self
    }

    /// A new pane of the same kind and name, wrapping `value` or a copy of
    /// the current value.
    #[must_use]
    pub fn clone_with(&self, value: Option<Value>) -> Rc<Self> {
        let value = value.unwrap_or_else(|| self.object());
        Self::with_kind(Arc::clone(&self.kind), value).named(self.name())
    }

    /// Model rendered for `root`, if any.
    #[must_use]
    pub fn model(&self, root: RootId) -> Option<ModelId> {
        self.base.model(root)
    }

    fn build_props(&self, value: &Value, max_restarts: u32) -> Result<Props> {
        for _ in 0..=max_restarts {
            if let BuildStep::Props(mut props) = self.kind.build(value)? {
                props.insert("name".into(), serde_json::Value::String(self.name()));
                return Ok(props);
            }
        }
        Err(Error::RerenderLoop {
            index: 0,
            limit: max_restarts,
        })
    }

    /// Bring this root's model in line with the current value.
    fn update(&self, cx: &mut RenderContext<'_>) -> Result<()> {
        let Some(model) = self.base.model(cx.root()) else {
            return Ok(());
        };
        let value = self.object();
        let props = self.build_props(&value, cx.max_restarts())?;
        if self.kind.supports_inplace_update() {
            cx.doc().update_props(model, props);
            self.show(cx.root(), value);
        } else if let Some(new) =
            cx.replace_model(self.base.id, &self.base.records, self.kind.model_kind(), props)
        {
            tracing::debug!(view = %self.base.id, old = %model, new = %new, "replaced pane model");
            self.show(cx.root(), value);
        }
        Ok(())
    }

    /// Note that `root` now shows `value`, releasing the value it showed
    /// before if that differs.
    fn show(&self, root: RootId, value: Value) {
        let previous = self.shown.borrow_mut().insert(root, value.clone());
        if let Some(old) = previous
            && old != value
        {
            self.kind.release(&old, root);
        }
    }
}

impl Viewable for Pane {
    fn id(&self) -> ViewId {
        self.base.id
    }

    fn type_name(&self) -> &'static str {
        self.kind.name()
    }

    fn label(&self) -> String {
        self.name()
    }

    fn records(&self) -> &RenderRecords {
        &self.base.records
    }

    fn watchers(&self) -> &Watchers {
        &self.base.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        let value = self.object();
        let mut props = match self.kind.build(&value)? {
            BuildStep::Props(props) => props,
            BuildStep::Rerender => return Ok(RenderStep::Rerender),
        };
        props.insert("name".into(), serde_json::Value::String(self.name()));
        let model = cx.create_model(
            self.base.id,
            &self.base.records,
            self.kind.model_kind(),
            props,
            parent,
        );
        self.show(cx.root(), value);
        Ok(RenderStep::Model(model))
    }

    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()> {
        match change {
            Change::Object => self.update(cx),
            Change::Property(_) => {
                if let Some(model) = self.base.model(cx.root()) {
                    cx.doc()
                        .set_prop(model, "name", serde_json::Value::String(self.name()));
                }
                Ok(())
            }
            Change::Objects => Ok(()),
        }
    }

    fn cleanup(&self, cx: &mut RenderContext<'_>) {
        let shown = self.shown.borrow_mut().remove(&cx.root());
        if cx.release_record(self.base.id, &self.base.records).is_some() {
            let value = shown.unwrap_or_else(|| self.object());
            self.kind.release(&value, cx.root());
        }
    }
}

impl fmt::Debug for Pane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pane")
            .field("id", &self.base.id)
            .field("kind", &self.kind.name())
            .field("object", &*self.object.borrow())
            .finish()
    }
}

/// Coerce a child into a view using `registry`: views pass through, values
/// are wrapped in a pane of the best-ranked kind.
pub fn coerce(registry: &PaneRegistry, child: Child) -> Result<View> {
    coerce_with_hints(registry, child, &Hints::new())
}

pub fn coerce_with_hints(registry: &PaneRegistry, child: Child, hints: &Hints) -> Result<View> {
    match registry.resolve(child, hints)? {
        Resolved::View(view) => Ok(view),
        Resolved::Kind(kind, value) => Ok(Pane::with_kind(kind, value).view()),
    }
}

/// Coerce a child with the built-in registry.
pub fn panel(child: impl Into<Child>) -> Result<View> {
    coerce(&default_registry(), child.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use trellis_core::{Applies, Document, Warning};

    /// Holds one external handle per shown value and logs every release.
    struct Handles {
        inplace: bool,
        released: Mutex<Vec<String>>,
    }

    impl Handles {
        fn new(inplace: bool) -> Arc<Self> {
            Arc::new(Self {
                inplace,
                released: Mutex::new(Vec::new()),
            })
        }

        fn released(&self) -> Vec<String> {
            self.released.lock().expect("lock").clone()
        }
    }

    impl PaneKind for Handles {
        fn name(&self) -> &'static str {
            "Handles"
        }

        fn priority(&self) -> Option<f64> {
            Some(0.0)
        }

        fn applies(&self, _value: &Value, _hints: &Hints) -> Applies {
            Applies::No
        }

        fn supports_inplace_update(&self) -> bool {
            self.inplace
        }

        fn build(&self, _value: &Value) -> Result<BuildStep> {
            Ok(BuildStep::Props(Props::new()))
        }

        fn release(&self, value: &Value, _root: RootId) {
            let name = value.as_str().unwrap_or_default().to_owned();
            self.released.lock().expect("lock").push(name);
        }
    }

    fn png() -> Value {
        let mut data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
        data.extend_from_slice(&[0, 0, 0, 2, 0, 0, 0, 2]);
        Value::bytes(data)
    }

    #[test]
    fn render_registers_record_and_props() {
        let pane = Pane::new("hello").expect("resolves");
        let mut doc = Document::new(RootId::MIN);
        let mut cx = RenderContext::new(&mut doc);
        let model = pane.view().get_root(&mut cx).expect("renders");
        drop(cx);

        assert_eq!(pane.model(RootId::MIN), Some(model));
        let data = doc.get(model).expect("model");
        assert_eq!(data.kind, "Markdown");
        assert_eq!(data.props["text"], serde_json::json!("hello"));
        assert_eq!(doc.owner(model), Some(pane.id()));
    }

    #[test]
    fn inplace_update_is_idempotent() {
        let pane = Pane::new("a").expect("resolves");
        let mut doc = Document::new(RootId::MIN);
        let mut cx = RenderContext::new(&mut doc);
        let model = pane.view().get_root(&mut cx).expect("renders");

        *pane.object.borrow_mut() = Value::from("b");
        pane.apply_change(&mut cx, &Change::Object).expect("update");
        let once = cx.doc_ref().snapshot(model);
        pane.apply_change(&mut cx, &Change::Object).expect("update");
        assert_eq!(cx.doc_ref().snapshot(model), once);
        assert_eq!(pane.model(RootId::MIN), Some(model));
        assert_eq!(once["props"]["text"], serde_json::json!("b"));
    }

    #[test]
    fn image_update_replaces_root_model() {
        let pane = Pane::new(png()).expect("resolves");
        assert_eq!(pane.kind().name(), "Image");
        let mut doc = Document::new(RootId::MIN);
        let mut cx = RenderContext::new(&mut doc);
        let old = pane.view().get_root(&mut cx).expect("renders");

        pane.apply_change(&mut cx, &Change::Object).expect("update");
        let new = pane.model(RootId::MIN).expect("still rendered");
        assert_ne!(new, old);
        assert_eq!(cx.doc_ref().root_model(), Some(new));
        assert!(!cx.doc_ref().contains(old));
    }

    #[test]
    fn replacement_race_skips_and_warns() {
        let pane = Pane::new(png()).expect("resolves");
        let mut doc = Document::new(RootId::MIN);
        let parent = doc.create("Column", Props::new(), None);
        let mut cx = RenderContext::new(&mut doc);
        let RenderStep::Model(old) = pane.render(&mut cx, Some(parent)).expect("renders") else {
            panic!("image never rerenders");
        };
        // The parent never listed the model as a child.
        pane.apply_change(&mut cx, &Change::Object).expect("skipped, not failed");
        assert_eq!(pane.model(RootId::MIN), Some(old));
        assert!(matches!(cx.warnings(), [Warning::ReplacementRace { .. }]));
    }

    #[test]
    fn clone_with_keeps_kind_and_name_but_not_identity() {
        let pane = Pane::new("x").expect("resolves").named("Intro");
        let copy = pane.clone_with(Some(Value::from("y")));
        assert_ne!(copy.id(), pane.id());
        assert_eq!(copy.name(), "Intro");
        assert_eq!(copy.kind().name(), "Markdown");
        assert_eq!(copy.object().as_str(), Some("y"));
    }

    #[test]
    fn panel_passes_views_through() {
        let pane = Pane::new(1).expect("resolves").view();
        let again = panel(&pane).expect("coerces");
        assert!(again.ptr_eq(&pane));
        let wrapped = panel(2.5).expect("coerces");
        assert!(wrapped.is::<Pane>());
    }

    #[test]
    fn replaced_values_are_released_once_per_root() {
        for inplace in [false, true] {
            let kind = Handles::new(inplace);
            let pane = Pane::with_kind(kind.clone(), Value::from("file-1"));
            let mut doc = Document::new(RootId::MIN);
            let mut cx = RenderContext::new(&mut doc);
            pane.view().get_root(&mut cx).expect("renders");

            pane.set_object("file-2");
            pane.apply_change(&mut cx, &Change::Object).expect("update");
            assert_eq!(kind.released(), vec!["file-1"]);

            // Applying the same value again holds on to it.
            pane.apply_change(&mut cx, &Change::Object).expect("update");
            pane.cleanup(&mut cx);
            pane.cleanup(&mut cx);
            assert_eq!(kind.released(), vec!["file-1", "file-2"]);
        }
    }
}
