#![forbid(unsafe_code)]

//! Card: a titled, collapsible column.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;
use trellis_core::{
    Change, Child, Error, ModelId, PaneRegistry, Props, RenderContext, RenderRecords, RenderStep,
    Result, View, ViewId, Viewable, Watchers,
};

use crate::base::{ContainerBase, new_cyclic};
use crate::kinds::default_registry;
use crate::list::{ListLayout, ObjectList};

pub struct Card {
    container: ContainerBase,
    list: ObjectList,
    title: RefCell<String>,
    collapsed: Cell<bool>,
    collapsible: bool,
}

impl Card {
    pub fn new<C: Into<Child>>(
        title: impl Into<String>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Rc<Self>> {
        Self::with_registry(default_registry(), title, children)
    }

    pub fn with_registry<C: Into<Child>>(
        registry: Arc<PaneRegistry>,
        title: impl Into<String>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Rc<Self>> {
        let objects = ObjectList::coerce_all(&registry, children)?;
        let list = ObjectList::new(registry, objects)?;
        let title = title.into();
        Ok(new_cyclic(|me| Self {
            container: ContainerBase::new(me),
            list,
            title: RefCell::new(title),
            collapsed: Cell::new(false),
            collapsible: true,
        }))
    }

    /// Card around one already-resolved view, starting collapsed.
    pub(crate) fn wrapping(registry: Arc<PaneRegistry>, title: String, object: View) -> Rc<Self> {
        let list = ObjectList::single(registry, object);
        new_cyclic(|me| Self {
            container: ContainerBase::new(me),
            list,
            title: RefCell::new(title),
            collapsed: Cell::new(true),
            collapsible: true,
        })
    }

    #[must_use]
    pub fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        if *self.title.borrow() == title {
            return;
        }
        *self.title.borrow_mut() = title;
        self.container.base.notify(Change::Property("title"));
    }

    #[must_use]
    pub fn collapsed(&self) -> bool {
        self.collapsed.get()
    }

    /// Set the collapse flag. Watchers hear about actual changes only.
    pub fn set_collapsed(&self, collapsed: bool) {
        if self.collapsed.replace(collapsed) != collapsed {
            self.container.base.notify(Change::Property("collapsed"));
        }
    }

    #[must_use]
    pub fn objects(&self) -> Vec<View> {
        self.list.snapshot()
    }

    pub fn clone_with(&self, objects: Option<Vec<Child>>) -> Result<Rc<Self>> {
        let children: Vec<Child> = match objects {
            Some(children) => children,
            None => self.list.snapshot().into_iter().map(Child::View).collect(),
        };
        let copy = Self::with_registry(Arc::clone(self.list.registry()), self.title(), children)?;
        copy.collapsed.set(self.collapsed());
        Ok(copy)
    }

    fn props(&self) -> Props {
        let mut props = Props::new();
        props.insert("title".into(), json!(self.title()));
        props.insert("collapsed".into(), json!(self.collapsed()));
        props.insert("collapsible".into(), json!(self.collapsible));
        props
    }
}

impl ListLayout for Card {
    fn list(&self) -> &ObjectList {
        &self.list
    }

    fn notify(&self, change: Change) {
        self.container.base.notify(change);
    }
}

impl Viewable for Card {
    fn id(&self) -> ViewId {
        self.container.base.id
    }

    fn type_name(&self) -> &'static str {
        "Card"
    }

    fn label(&self) -> String {
        self.title()
    }

    fn records(&self) -> &RenderRecords {
        &self.container.base.records
    }

    fn watchers(&self) -> &Watchers {
        &self.container.base.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        self.container
            .render(cx, parent, "Card", self.props(), &self.list.snapshot())
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

    fn on_client_change(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        match name {
            "collapsed" => {
                let collapsed = value
                    .as_bool()
                    .ok_or_else(|| Error::render("Card", format!("collapsed expects a bool, got {value}")))?;
                self.set_collapsed(collapsed);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("id", &self.container.base.id)
            .field("title", &*self.title.borrow())
            .field("collapsed", &self.collapsed.get())
            .finish()
    }
}
