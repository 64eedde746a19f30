#![forbid(unsafe_code)]

//! Change dispatch across roots: immediate when a root is idle, FIFO
//! deferred while it is busy, and client events routed to model owners.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::json;
use trellis_core::{
    Change, ModelId, Props, RenderContext, RenderRecords, RenderStep, Result, RootId, View, ViewId,
    Viewable, Watchers,
};
use trellis_runtime::{NamedLayout, Pane, Session, Tabs};

/// Records every change applied to it, per root. A client event makes it
/// report two property changes in a row.
struct Recorder {
    id: ViewId,
    me: Weak<Recorder>,
    records: RenderRecords,
    watchers: Watchers,
    log: RefCell<Vec<(RootId, &'static str)>>,
}

impl Recorder {
    fn new() -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            id: ViewId::next(),
            me: me.clone(),
            records: RenderRecords::new(),
            watchers: Watchers::new(),
            log: RefCell::new(Vec::new()),
        })
    }

    fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }
}

impl Viewable for Recorder {
    fn id(&self) -> ViewId {
        self.id
    }

    fn type_name(&self) -> &'static str {
        "Recorder"
    }

    fn label(&self) -> String {
        "recorder".into()
    }

    fn records(&self) -> &RenderRecords {
        &self.records
    }

    fn watchers(&self) -> &Watchers {
        &self.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        let model = cx.create_model(self.id, &self.records, "Recorder", Props::new(), parent);
        Ok(RenderStep::Model(model))
    }

    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()> {
        if let Change::Property(name) = change {
            self.log.borrow_mut().push((cx.root(), *name));
        }
        Ok(())
    }

    fn cleanup(&self, cx: &mut RenderContext<'_>) {
        cx.release_record(self.id, &self.records);
    }

    fn on_client_change(&self, _name: &str, _value: &serde_json::Value) -> Result<()> {
        if let Some(me) = self.me.upgrade() {
            let view = me.view();
            self.watchers.notify(&view, &Change::Property("first"));
            self.watchers.notify(&view, &Change::Property("second"));
        }
        Ok(())
    }
}

#[test]
fn busy_root_defers_in_order_while_idle_root_applies_now() {
    let recorder = Recorder::new();
    let session = Session::new();
    let busy = session.add_root(&recorder.view()).expect("busy");
    let idle = session.add_root(&recorder.view()).expect("idle");
    let model = session.get_root(busy).expect("model");

    session
        .receive(busy, model, "clicks", json!(1))
        .expect("receive");

    assert_eq!(
        *recorder.log.borrow(),
        vec![
            (idle, "first"),
            (idle, "second"),
            (busy, "first"),
            (busy, "second"),
        ]
    );
    assert_eq!(session.pending(busy).expect("root"), 0);
    let clicks = session
        .with_document(busy, |doc| doc.prop(model, "clicks").cloned())
        .expect("doc");
    assert_eq!(clicks, Some(json!(1)));
}

#[test]
fn closing_a_tab_from_the_client_updates_the_model() {
    let tabs = Tabs::new([("A", "alpha"), ("B", "beta"), ("C", "gamma")]).expect("tabs");
    tabs.set_closable(true);
    let session = Session::new();
    let root = session.add_root(&tabs.view()).expect("root");
    let model = session.get_root(root).expect("model");
    let closed = tabs.get(0).expect("first tab");

    session
        .receive(root, model, "closed", json!(0))
        .expect("receive");

    assert_eq!(tabs.names(), vec!["B", "C"]);
    assert!(closed.records().is_empty());
    let (children, names) = session
        .with_document(root, |doc| {
            (doc.children(model).len(), doc.prop(model, "names").cloned())
        })
        .expect("doc");
    assert_eq!(children, 2);
    assert_eq!(names, Some(json!(["B", "C"])));
}

#[test]
fn client_event_for_a_nested_pane_reaches_its_owner() {
    let tabs = Tabs::new([("A", "alpha")]).expect("tabs");
    let session = Session::new();
    let root = session.add_root(&tabs.view()).expect("root");
    let pane = tabs.get(0).expect("pane");
    let pane_model = pane.records().get(root).expect("rendered").model;

    session
        .receive(root, pane_model, "scroll", json!(42))
        .expect("receive");
    let scroll = session
        .with_document(root, |doc| doc.prop(pane_model, "scroll").cloned())
        .expect("doc");
    assert_eq!(scroll, Some(json!(42)));
    assert!(pane.is::<Pane>());
}

#[test]
fn dropping_the_session_releases_every_root() {
    let tabs = Tabs::new([("A", "alpha"), ("B", "beta")]).expect("tabs");
    let tree = tabs.view().render_tree();
    {
        let session = Session::new();
        session.add_root(&tabs.view()).expect("root");
        session.add_root(&tabs.view()).expect("root");
        assert!(tree.iter().all(|v| v.records().len() == 2));
    }
    assert!(tree.iter().all(|v| v.records().is_empty()));
}
