#![forbid(unsafe_code)]

//! In-process visual-model toolkit.
//!
//! A [`Document`] is the model tree of one root. Models are opaque records
//! with a kind tag, a mutable property bag and an ordered child list. The
//! document also records which view owns each model so that events coming
//! back from the client can be routed to the right view.
//!
//! # Invariants
//!
//! 1. Every id in a model's `children` refers to a live model whose `parent`
//!    is that model.
//! 2. Removing a model detaches it from its parent and drops its owner
//!    binding in the same step.

use std::collections::BTreeMap;

use crate::id::{ModelId, RootId, ViewId};

/// Property bag of a model.
pub type Props = BTreeMap<String, serde_json::Value>;

/// One toolkit model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub kind: String,
    pub props: Props,
    pub children: Vec<ModelId>,
    pub parent: Option<ModelId>,
}

/// Model tree for a single root.
#[derive(Debug)]
pub struct Document {
    root_id: RootId,
    next_model: u64,
    models: BTreeMap<ModelId, ModelData>,
    owners: BTreeMap<ModelId, ViewId>,
    root_model: Option<ModelId>,
}

impl Document {
    #[must_use]
    pub fn new(root_id: RootId) -> Self {
        Self {
            root_id,
            next_model: 1,
            models: BTreeMap::new(),
            owners: BTreeMap::new(),
            root_model: None,
        }
    }

    #[must_use]
    pub const fn root_id(&self) -> RootId {
        self.root_id
    }

    /// Top-level model, once the root view has been rendered.
    #[must_use]
    pub const fn root_model(&self) -> Option<ModelId> {
        self.root_model
    }

    pub fn set_root_model(&mut self, model: Option<ModelId>) {
        self.root_model = model;
    }

    /// Construct a model. It is not attached to `parent`'s child list; the
    /// parent's view does that when it writes its children.
    pub fn create(&mut self, kind: impl Into<String>, props: Props, parent: Option<ModelId>) -> ModelId {
        let id = ModelId::new(self.next_model);
        self.next_model += 1;
        self.models.insert(
            id,
            ModelData {
                kind: kind.into(),
                props,
                children: Vec::new(),
                parent,
            },
        );
        id
    }

    #[must_use]
    pub fn get(&self, id: ModelId) -> Option<&ModelData> {
        self.models.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ModelId) -> bool {
        self.models.contains_key(&id)
    }

    /// Number of live models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    #[must_use]
    pub fn prop(&self, id: ModelId, name: &str) -> Option<&serde_json::Value> {
        self.models.get(&id).and_then(|m| m.props.get(name))
    }

    /// Set one property. Returns `true` if the stored value changed.
    pub fn set_prop(&mut self, id: ModelId, name: &str, value: serde_json::Value) -> bool {
        let Some(model) = self.models.get_mut(&id) else {
            return false;
        };
        if model.props.get(name) == Some(&value) {
            return false;
        }
        model.props.insert(name.to_string(), value);
        true
    }

    /// Apply a batch of properties; returns how many changed.
    pub fn update_props(&mut self, id: ModelId, props: Props) -> usize {
        props
            .into_iter()
            .filter(|(name, value)| self.set_prop(id, name, value.clone()))
            .count()
    }

    #[must_use]
    pub fn children(&self, id: ModelId) -> &[ModelId] {
        self.models.get(&id).map_or(&[], |m| m.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, id: ModelId) -> Option<ModelId> {
        self.models.get(&id).and_then(|m| m.parent)
    }

    /// Replace a model's child list, fixing up parent links.
    pub fn set_children(&mut self, id: ModelId, children: Vec<ModelId>) {
        if !self.models.contains_key(&id) {
            return;
        }
        for child in &children {
            if let Some(model) = self.models.get_mut(child) {
                model.parent = Some(id);
            }
        }
        if let Some(model) = self.models.get_mut(&id) {
            model.children = children;
        }
    }

    /// Swap `old` for `new` in `parent`'s child list.
    ///
    /// Returns `false` without touching anything if `old` is not currently a
    /// child of `parent`.
    pub fn replace_child(&mut self, parent: ModelId, old: ModelId, new: ModelId) -> bool {
        let Some(slot) = self
            .models
            .get(&parent)
            .and_then(|m| m.children.iter().position(|c| *c == old))
        else {
            return false;
        };
        if let Some(model) = self.models.get_mut(&parent) {
            model.children[slot] = new;
        }
        if let Some(model) = self.models.get_mut(&new) {
            model.parent = Some(parent);
        }
        true
    }

    /// Record `view` as the owner of `model`.
    pub fn bind(&mut self, model: ModelId, view: ViewId) {
        self.owners.insert(model, view);
    }

    /// View owning `model`, if any.
    #[must_use]
    pub fn owner(&self, model: ModelId) -> Option<ViewId> {
        self.owners.get(&model).copied()
    }

    /// Remove a model from the document.
    ///
    /// Child models are left in place; their owning views release them.
    pub fn remove(&mut self, id: ModelId) -> bool {
        let Some(model) = self.models.remove(&id) else {
            return false;
        };
        self.owners.remove(&id);
        if let Some(parent) = model.parent
            && let Some(parent_model) = self.models.get_mut(&parent)
        {
            parent_model.children.retain(|c| *c != id);
        }
        for child in model.children {
            if let Some(child_model) = self.models.get_mut(&child)
                && child_model.parent == Some(id)
            {
                child_model.parent = None;
            }
        }
        if self.root_model == Some(id) {
            self.root_model = None;
        }
        true
    }

    /// JSON dump of the subtree rooted at `id`, for debugging and tests.
    #[must_use]
    pub fn snapshot(&self, id: ModelId) -> serde_json::Value {
        let Some(model) = self.models.get(&id) else {
            return serde_json::Value::Null;
        };
        let children: Vec<serde_json::Value> =
            model.children.iter().map(|c| self.snapshot(*c)).collect();
        serde_json::json!({
            "id": id.get(),
            "kind": model.kind,
            "props": model.props,
            "children": children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, serde_json::Value)]) -> Props {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn create_and_set_children_links_parents() {
        let mut doc = Document::new(RootId::MIN);
        let parent = doc.create("Column", Props::new(), None);
        let a = doc.create("Text", props(&[("text", json!("a"))]), None);
        let b = doc.create("Text", props(&[("text", json!("b"))]), None);
        doc.set_children(parent, vec![a, b]);

        assert_eq!(doc.children(parent), &[a, b]);
        assert_eq!(doc.parent(a), Some(parent));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn set_prop_reports_change_only_once() {
        let mut doc = Document::new(RootId::MIN);
        let m = doc.create("Text", Props::new(), None);
        assert!(doc.set_prop(m, "text", json!("hi")));
        assert!(!doc.set_prop(m, "text", json!("hi")));
        assert_eq!(doc.prop(m, "text"), Some(&json!("hi")));
    }

    #[test]
    fn replace_child_requires_membership() {
        let mut doc = Document::new(RootId::MIN);
        let parent = doc.create("Row", Props::new(), None);
        let a = doc.create("Text", Props::new(), None);
        let b = doc.create("Text", Props::new(), None);
        let stray = doc.create("Text", Props::new(), None);
        doc.set_children(parent, vec![a]);

        assert!(!doc.replace_child(parent, stray, b));
        assert!(doc.replace_child(parent, a, b));
        assert_eq!(doc.children(parent), &[b]);
    }

    #[test]
    fn remove_detaches_and_unbinds() {
        let mut doc = Document::new(RootId::MIN);
        let parent = doc.create("Row", Props::new(), None);
        let a = doc.create("Text", Props::new(), Some(parent));
        doc.set_children(parent, vec![a]);
        doc.bind(a, ViewId::next());

        assert!(doc.remove(a));
        assert!(!doc.remove(a));
        assert!(doc.children(parent).is_empty());
        assert_eq!(doc.owner(a), None);
    }

    #[test]
    fn snapshot_nests_children() {
        let mut doc = Document::new(RootId::MIN);
        let parent = doc.create("Row", Props::new(), None);
        let a = doc.create("Text", props(&[("text", json!("a"))]), None);
        doc.set_children(parent, vec![a]);
        let snap = doc.snapshot(parent);
        assert_eq!(snap["children"][0]["props"]["text"], json!("a"));
    }
}
