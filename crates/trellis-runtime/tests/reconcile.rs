#![forbid(unsafe_code)]

//! Reconciler behavior observed through real containers.
//!
//! Run:
//!   cargo test -p trellis-runtime --test reconcile

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use trellis_core::{
    Applies, BuildStep, Child, Document, Error, Hints, ModelId, PaneKind, Props, RenderContext,
    Result, RootId, Value, View,
};
use trellis_runtime::{GridSpec, ListLayout, ListPanel, Pane, Session};

/// Asks for a rerender the first `pending` times it is built.
struct Flaky {
    pending: AtomicU32,
    builds: AtomicU32,
}

impl Flaky {
    fn new(pending: u32) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicU32::new(pending),
            builds: AtomicU32::new(0),
        })
    }
}

impl PaneKind for Flaky {
    fn name(&self) -> &'static str {
        "Flaky"
    }

    fn priority(&self) -> Option<f64> {
        Some(0.0)
    }

    fn applies(&self, _value: &Value, _hints: &Hints) -> Applies {
        Applies::No
    }

    fn build(&self, _value: &Value) -> Result<BuildStep> {
        self.builds.fetch_add(1, Ordering::Relaxed);
        let left = self.pending.load(Ordering::Relaxed);
        if left > 0 {
            self.pending.store(left - 1, Ordering::Relaxed);
            return Ok(BuildStep::Rerender);
        }
        Ok(BuildStep::Props(Props::new()))
    }
}

struct Broken;

impl PaneKind for Broken {
    fn name(&self) -> &'static str {
        "Broken"
    }

    fn priority(&self) -> Option<f64> {
        Some(0.0)
    }

    fn applies(&self, _value: &Value, _hints: &Hints) -> Applies {
        Applies::No
    }

    fn build(&self, _value: &Value) -> Result<BuildStep> {
        Err(Error::render("Broken", "always fails"))
    }
}

fn model_of(view: &View, root: RootId) -> ModelId {
    view.records().get(root).expect("rendered").model
}

fn children(session: &Session, root: RootId, model: ModelId) -> Vec<ModelId> {
    session
        .with_document(root, |doc| doc.children(model).to_vec())
        .expect("document")
}

#[test]
fn insert_reuses_surviving_models() {
    let a = Pane::new("A").expect("pane").view();
    let b = Pane::new("B").expect("pane").view();
    let column = ListPanel::column([&a, &b]).expect("column");
    let session = Session::new();
    let root = session.add_root(&column.view()).expect("root");
    let (ma, mb) = (model_of(&a, root), model_of(&b, root));

    let c = column.insert(1, "C").expect("insert");

    let top = session.get_root(root).expect("top");
    assert_eq!(model_of(&a, root), ma);
    assert_eq!(model_of(&b, root), mb);
    assert_eq!(children(&session, root, top), vec![ma, model_of(&c, root), mb]);
}

#[test]
fn removed_children_are_released_exactly_once() {
    let a = Pane::new("A").expect("pane").view();
    let b = Pane::new("B").expect("pane").view();
    let column = ListPanel::column([&a, &b]).expect("column");
    let session = Session::new();
    let root = session.add_root(&column.view()).expect("root");
    let mb = model_of(&b, root);

    assert!(column.remove(&b).expect("remove"));
    assert!(b.records().is_empty());
    let gone = session
        .with_document(root, |doc| !doc.contains(mb) && doc.owner(mb).is_none())
        .expect("document");
    assert!(gone);
}

#[test]
fn moving_a_child_between_containers_keeps_it_rendered() {
    let a = Pane::new("A").expect("pane").view();
    let left = ListPanel::column([&a]).expect("left");
    let right = ListPanel::column(Vec::<View>::new()).expect("right");
    let row = ListPanel::row([left.view(), right.view()]).expect("row");
    let session = Session::new();
    let root = session.add_root(&row.view()).expect("root");

    right.append(&a).expect("append");
    left.remove(&a).expect("remove");

    let record = a.records().get(root).expect("still rendered");
    assert_eq!(record.parent, Some(model_of(&right.view(), root)));
    assert_eq!(children(&session, root, record.parent.expect("parent")), vec![record.model]);
}

#[test]
fn cleanup_leaves_other_roots_alone() {
    let grid = GridSpec::new();
    grid.assign(0..1, 0..2, "header").expect("assign");
    let nested = ListPanel::row(["x", "y"]).expect("row");
    let column = ListPanel::column([grid.view(), nested.view()]).expect("column");
    let session = Session::new();
    let r1 = session.add_root(&column.view()).expect("r1");
    let r2 = session.add_root(&column.view()).expect("r2");

    session.cleanup(r1).expect("cleanup");
    let tree = column.view().render_tree();
    assert_eq!(tree.len(), 6);
    assert!(tree.iter().all(|v| v.records().roots() == vec![r2]));

    session.cleanup(r2).expect("cleanup");
    assert!(tree.iter().all(|v| v.records().is_empty()));
}

#[test]
fn single_rerender_request_is_retried() {
    let kind = Flaky::new(1);
    let flaky = Pane::with_kind(kind.clone(), Value::from("f")).view();
    let first = Pane::new("first").expect("pane").view();
    let column = ListPanel::column([Child::from(&first), Child::from(flaky), Child::from("last")])
        .expect("column");

    let mut doc = Document::new(RootId::MIN);
    let mut cx = RenderContext::new(&mut doc);
    let top = column.view().get_root(&mut cx).expect("renders");
    assert_eq!(cx.stats().restarts, 1);
    // `first` was rendered twice: once before the restart, once after.
    assert_eq!(cx.stats().rendered, 5);
    drop(cx);

    assert_eq!(doc.children(top).len(), 3);
    assert_eq!(doc.len(), 4);
    assert_eq!(kind.builds.load(Ordering::Relaxed), 2);
    assert_eq!(doc.children(top)[0], model_of(&first, RootId::MIN));
}

#[test]
fn persistent_rerender_fails_without_leaking_models() {
    let flaky = Pane::with_kind(Flaky::new(u32::MAX), Value::from("f")).view();
    let first = Pane::new("first").expect("pane").view();
    let column = ListPanel::column([first.clone(), flaky]).expect("column");

    let mut doc = Document::new(RootId::MIN);
    let mut cx = RenderContext::new(&mut doc).with_max_restarts(2);
    let err = column.view().get_root(&mut cx).err().expect("loop");
    assert!(matches!(err, Error::RerenderLoop { index: 1, limit: 2 }));
    drop(cx);

    assert!(doc.is_empty());
    assert!(first.records().is_empty());
    assert!(column.view().records().is_empty());
}

#[test]
fn render_failure_keeps_last_good_state() {
    let a = Pane::new("A").expect("pane").view();
    let column = ListPanel::column([&a]).expect("column");
    let session = Session::new();
    let root = session.add_root(&column.view()).expect("root");
    let top = session.get_root(root).expect("top");
    let before = session.snapshot(root).expect("snapshot");

    let broken = Pane::with_kind(Arc::new(Broken), Value::from("x"));
    column.append(broken.view()).expect("mutation itself succeeds");

    let errors = session.take_errors();
    assert!(matches!(errors.as_slice(), [Error::Render { kind: "Broken", .. }]));
    assert_eq!(children(&session, root, top), vec![model_of(&a, root)]);
    assert_eq!(session.snapshot(root).expect("snapshot"), before);
    assert!(broken.view().records().is_empty());
}

#[test]
fn duplicate_child_is_rejected_up_front() {
    let a = Pane::new("A").expect("pane").view();
    let column = ListPanel::column([&a]).expect("column");
    let err = column.append(&a).err().expect("duplicate");
    assert!(matches!(err, Error::DuplicateChild { view } if view == a.id()));
    assert_eq!(column.len(), 1);
    assert!(ListPanel::row([&a, &a]).is_err());
}

#[test]
fn shared_child_never_sits_in_two_parents() {
    let x = Pane::new("x").expect("pane").view();
    let a = ListPanel::row([&x]).expect("a");
    let b = ListPanel::row([&x]).expect("b");
    let column = ListPanel::column([a.view(), b.view()]).expect("column");
    let session = Session::new();
    let root = session.add_root(&column.view()).expect("root");

    let y = a.append("y").expect("append");
    let (ma, mb) = (model_of(&a.view(), root), model_of(&b.view(), root));
    let mx = model_of(&x, root);
    assert_eq!(x.records().get(root).and_then(|r| r.parent), Some(ma));
    assert_eq!(children(&session, root, ma), vec![mx, model_of(&y, root)]);
    assert!(!children(&session, root, mb).contains(&mx));

    b.remove(&x).expect("remove");
    assert_eq!(x.records().get(root).map(|r| r.model), Some(mx));
    assert_eq!(children(&session, root, ma).len(), a.len());
    assert!(session.take_errors().is_empty());
}
