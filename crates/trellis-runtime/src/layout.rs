#![forbid(unsafe_code)]

//! Row, Column and WidgetBox: children laid out along one axis.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;
use trellis_core::{
    Change, Child, ModelId, PaneRegistry, Props, RenderContext, RenderRecords, RenderStep, Result,
    View, ViewId, Viewable, Watchers,
};

use crate::base::{ContainerBase, default_label, new_cyclic};
use crate::kinds::default_registry;
use crate::list::{ListLayout, ObjectList};

/// Which flavor of list layout this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Row,
    Column,
    /// Widget group, vertical unless `horizontal`.
    WidgetBox { horizontal: bool },
}

impl ListKind {
    const fn model_kind(self) -> &'static str {
        match self {
            Self::Row => "Row",
            Self::Column => "Column",
            Self::WidgetBox { .. } => "WidgetBox",
        }
    }
}

pub struct ListPanel {
    container: ContainerBase,
    list: ObjectList,
    kind: ListKind,
}

impl ListPanel {
    pub fn row<C: Into<Child>>(children: impl IntoIterator<Item = C>) -> Result<Rc<Self>> {
        Self::with_registry(ListKind::Row, default_registry(), children)
    }

    pub fn column<C: Into<Child>>(children: impl IntoIterator<Item = C>) -> Result<Rc<Self>> {
        Self::with_registry(ListKind::Column, default_registry(), children)
    }

    pub fn widget_box<C: Into<Child>>(
        children: impl IntoIterator<Item = C>,
        horizontal: bool,
    ) -> Result<Rc<Self>> {
        Self::with_registry(ListKind::WidgetBox { horizontal }, default_registry(), children)
    }

    pub fn with_registry<C: Into<Child>>(
        kind: ListKind,
        registry: Arc<PaneRegistry>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Rc<Self>> {
        let objects = ObjectList::coerce_all(&registry, children)?;
        let list = ObjectList::new(registry, objects)?;
        Ok(new_cyclic(|me| Self {
            container: ContainerBase::new(me),
            list,
            kind,
        }))
    }

    #[must_use]
    pub fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }

    #[must_use]
    pub const fn kind(&self) -> ListKind {
        self.kind
    }

    #[must_use]
    pub fn objects(&self) -> Vec<View> {
        self.list.snapshot()
    }

    /// Copy this layout. `None` keeps the current children (shared by
    /// identity), `Some` replaces them.
    pub fn clone_with(&self, objects: Option<Vec<Child>>) -> Result<Rc<Self>> {
        let children: Vec<Child> = match objects {
            Some(children) => children,
            None => self.list.snapshot().into_iter().map(Child::View).collect(),
        };
        Self::with_registry(self.kind, Arc::clone(self.list.registry()), children)
    }

    fn props(&self) -> Props {
        let mut props = Props::new();
        props.insert("name".into(), json!(self.label()));
        if let ListKind::WidgetBox { horizontal } = self.kind {
            props.insert("horizontal".into(), json!(horizontal));
        }
        props
    }
}

impl ListLayout for ListPanel {
    fn list(&self) -> &ObjectList {
        &self.list
    }

    fn notify(&self, change: Change) {
        self.container.base.notify(change);
    }
}

impl Viewable for ListPanel {
    fn id(&self) -> ViewId {
        self.container.base.id
    }

    fn type_name(&self) -> &'static str {
        self.kind.model_kind()
    }

    fn label(&self) -> String {
        default_label(self.kind.model_kind(), self.container.base.id)
    }

    fn records(&self) -> &RenderRecords {
        &self.container.base.records
    }

    fn watchers(&self) -> &Watchers {
        &self.container.base.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        self.container
            .render(cx, parent, self.kind.model_kind(), self.props(), &self.list.snapshot())
    }

    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()> {
        self.container
            .apply_change(cx, change, self.props(), &self.list.snapshot())
    }

    fn cleanup(&self, cx: &mut RenderContext<'_>) {
        self.container.cleanup(cx);
    }

    fn objects(&self) -> Vec<View> {
        self.list.snapshot()
    }
}

impl fmt::Debug for ListPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListPanel")
            .field("id", &self.container.base.id)
            .field("kind", &self.kind)
            .field("objects", &self.list.snapshot())
            .finish()
    }
}
