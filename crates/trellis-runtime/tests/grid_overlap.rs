#![forbid(unsafe_code)]

//! Overlap policy of GridSpec as seen by a rendered root.

use serde_json::json;
use trellis_core::{Error, Warning};
use trellis_layout::OverlapMode;
use trellis_runtime::{GridSpec, Pane, Session};

#[test]
fn error_policy_leaves_rendered_grid_untouched() {
    let grid = GridSpec::fixed(None, None, OverlapMode::Error);
    let x = Pane::new("X").expect("pane").view();
    grid.assign(0..2, 0..2, &x).expect("assign");
    let session = Session::new();
    let root = session.add_root(&grid.view()).expect("root");
    let before = session.snapshot(root).expect("snapshot");

    let err = grid.assign(1..3, 1..3, "Y").err().expect("overlap");
    let Error::Overlap { count, detail, .. } = err else {
        panic!("expected an overlap error");
    };
    assert_eq!(count, 1);
    assert!(detail.contains("existing [0:2, 0:2]"));
    assert!(detail.contains("  11.\n  121\n  .11\n"));
    assert_eq!(session.snapshot(root).expect("snapshot"), before);
}

#[test]
fn override_policy_releases_replaced_entry() {
    let grid = GridSpec::fixed(None, None, OverlapMode::Override);
    let x = Pane::new("X").expect("pane").view();
    grid.assign(0..2, 0..2, &x).expect("assign");
    let session = Session::new();
    let root = session.add_root(&grid.view()).expect("root");
    let x_model = x.records().get(root).expect("rendered").model;

    let warning = grid.assign(1..3, 1..3, "Y").expect("replaces");
    assert!(warning.is_none());
    assert!(x.records().is_empty());

    let top = session.get_root(root).expect("top");
    let (gone, positions, nrows) = session
        .with_document(root, |doc| {
            (
                !doc.contains(x_model),
                doc.prop(top, "positions").cloned(),
                doc.prop(top, "nrows").cloned(),
            )
        })
        .expect("doc");
    assert!(gone);
    assert_eq!(positions, Some(json!([[1, 1, 2, 2]])));
    assert_eq!(nrows, Some(json!(3)));
}

#[test]
fn warn_policy_reports_and_range_query_sees_new_entry() {
    let grid = GridSpec::new();
    grid.assign(0..2, 0..2, "X").expect("assign");
    let y = Pane::new("Y").expect("pane").view();
    let warning = grid.assign(1..3, 1..3, &y).expect("replaces");
    assert!(matches!(warning, Some(Warning::Overlap { replaced: 1, .. })));
    assert_eq!(grid.get_region(0..3, 0..3).expect("query"), vec![y]);
}
