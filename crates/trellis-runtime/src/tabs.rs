#![forbid(unsafe_code)]

//! Tabs: named children, one of which is shown.
//!
//! The `active` index is clamped whenever the child sequence shrinks. The
//! client may report a new active tab or, when `closable`, a closed tab;
//! both arrive through [`Viewable::on_client_change`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;
use trellis_core::{
    Change, Error, ModelId, PaneRegistry, Props, RenderContext, RenderRecords, RenderStep, Result,
    View, ViewId, Viewable, Watchers,
};

use crate::base::{ContainerBase, default_label, new_cyclic};
use crate::kinds::default_registry;
use crate::named::{NamedChild, NamedLayout, NamedList};

pub struct Tabs {
    container: ContainerBase,
    named: NamedList,
    active: Cell<usize>,
    closable: Cell<bool>,
}

impl Tabs {
    pub fn new<C: Into<NamedChild>>(children: impl IntoIterator<Item = C>) -> Result<Rc<Self>> {
        Self::with_registry(default_registry(), children)
    }

    pub fn with_registry<C: Into<NamedChild>>(
        registry: Arc<PaneRegistry>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Rc<Self>> {
        let children = children.into_iter().map(Into::into).collect();
        let named = NamedList::new(registry, children)?;
        Ok(new_cyclic(|me| Self {
            container: ContainerBase::new(me),
            named,
            active: Cell::new(0),
            closable: Cell::new(false),
        }))
    }

    #[must_use]
    pub fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }

    #[must_use]
    pub fn objects(&self) -> Vec<View> {
        self.named.objects()
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.active.get()
    }

    /// Select tab `index`.
    pub fn set_active(&self, index: usize) -> Result<()> {
        let len = self.named.len();
        if index >= len && !(index == 0 && len == 0) {
            return Err(Error::IndexOutOfRange { index, len });
        }
        if self.active.replace(index) != index {
            self.container.base.notify(Change::Property("active"));
        }
        Ok(())
    }

    #[must_use]
    pub fn closable(&self) -> bool {
        self.closable.get()
    }

    pub fn set_closable(&self, closable: bool) {
        if self.closable.replace(closable) != closable {
            self.container.base.notify(Change::Property("closable"));
        }
    }

    /// Copy with the same names, active tab and closability. `None` shares
    /// the current children by identity.
    pub fn clone_with(&self, children: Option<Vec<NamedChild>>) -> Result<Rc<Self>> {
        let children = children.unwrap_or_else(|| {
            let entries = self.named.snapshot();
            entries
                .names
                .into_iter()
                .zip(entries.objects)
                .map(NamedChild::from)
                .collect()
        });
        let copy = Self::with_registry(Arc::clone(self.named.registry()), children)?;
        copy.closable.set(self.closable());
        copy.active.set(self.active().min(copy.named.len().saturating_sub(1)));
        Ok(copy)
    }

    fn props(&self) -> Props {
        let mut props = Props::new();
        props.insert("names".into(), json!(self.named.names()));
        props.insert("active".into(), json!(self.active()));
        props.insert("closable".into(), json!(self.closable()));
        props
    }
}

impl NamedLayout for Tabs {
    fn named(&self) -> &NamedList {
        &self.named
    }

    fn notify(&self, change: Change) {
        self.container.base.notify(change);
    }

    fn entries_changed(&self) {
        let last = self.named.len().saturating_sub(1);
        if self.active.get() > last {
            self.active.set(last);
        }
    }
}

fn index_arg(kind: &'static str, name: &str, value: &serde_json::Value) -> Result<usize> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| Error::render(kind, format!("{name} expects an index, got {value}")))
}

impl Viewable for Tabs {
    fn id(&self) -> ViewId {
        self.container.base.id
    }

    fn type_name(&self) -> &'static str {
        "Tabs"
    }

    fn label(&self) -> String {
        default_label("Tabs", self.container.base.id)
    }

    fn records(&self) -> &RenderRecords {
        &self.container.base.records
    }

    fn watchers(&self) -> &Watchers {
        &self.container.base.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        self.container
            .render(cx, parent, "Tabs", self.props(), &self.named.objects())
    }

    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()> {
        self.container
            .apply_change(cx, change, self.props(), &self.named.objects())
    }

    fn cleanup(&self, cx: &mut RenderContext<'_>) {
        self.container.cleanup(cx);
    }

    fn objects(&self) -> Vec<View> {
        self.named.objects()
    }

    fn on_client_change(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        match name {
            "active" => self.set_active(index_arg("Tabs", name, value)?),
            "closed" => {
                if !self.closable() {
                    tracing::debug!(tabs = %self.container.base.id, "ignoring close on non-closable tabs");
                    return Ok(());
                }
                self.pop(index_arg("Tabs", name, value)?).map(|_| ())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Tabs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tabs")
            .field("id", &self.container.base.id)
            .field("names", &self.named.names())
            .field("active", &self.active.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::Pane;

    #[test]
    fn reverse_moves_names_with_children() {
        let w1 = Pane::new("one").expect("pane").view();
        let w2 = Pane::new("two").expect("pane").view();
        let tabs = Tabs::new([("A", &w1), ("B", &w2)]).expect("tabs");
        tabs.reverse().expect("reverse");
        assert_eq!(tabs.names(), vec!["B", "A"]);
        assert_eq!(tabs.objects(), vec![w2, w1]);
    }

    #[test]
    fn active_is_clamped_when_tabs_go_away() {
        let tabs = Tabs::new([("A", "a"), ("B", "b"), ("C", "c")]).expect("tabs");
        tabs.set_active(2).expect("active");
        tabs.pop(2).expect("pop");
        assert_eq!(tabs.active(), 1);
        tabs.clear().expect("clear");
        assert_eq!(tabs.active(), 0);
        assert!(tabs.set_active(0).is_ok());
        assert!(tabs.set_active(1).is_err());
    }

    #[test]
    fn client_events() {
        let tabs = Tabs::new([("A", "a"), ("B", "b")]).expect("tabs");
        tabs.on_client_change("active", &json!(1)).expect("active");
        assert_eq!(tabs.active(), 1);
        assert!(tabs.on_client_change("active", &json!("x")).is_err());

        tabs.on_client_change("closed", &json!(0)).expect("ignored");
        assert_eq!(tabs.len(), 2);
        tabs.set_closable(true);
        tabs.on_client_change("closed", &json!(0)).expect("closed");
        assert_eq!(tabs.names(), vec!["B"]);
        assert_eq!(tabs.active(), 0);
    }

    #[test]
    fn clone_with_keeps_names_and_state() {
        let tabs = Tabs::new([("A", "a"), ("B", "b")]).expect("tabs");
        tabs.set_active(1).expect("active");
        tabs.set_closable(true);
        let copy = tabs.clone_with(None).expect("clone");
        assert_eq!(copy.names(), tabs.names());
        assert_eq!(copy.objects(), tabs.objects());
        assert_eq!((copy.active(), copy.closable()), (1, true));
    }
}
