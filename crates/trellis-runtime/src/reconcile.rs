#![forbid(unsafe_code)]

//! Model reconciliation.
//!
//! Brings one container's child models in a root up to date with its
//! current child sequence, reusing every model whose view survived.
//!
//! # Algorithm
//!
//! Children are visited in current order:
//!
//! - a view present in `old` whose record for this root still hangs under
//!   `parent` keeps its model untouched;
//! - any other view is rendered. This includes a view whose record was
//!   taken over by another container in the same root: rendering it here
//!   moves the single model back, so no model ever sits in two child lists.
//!
//! A render that answers [`RenderStep::Rerender`] at position `i` aborts the
//! attempt: every model freshly built in this attempt (necessarily at a
//! position before `i`) is released and the walk restarts. Models that
//! existed before the pass are left alone. Each position may restart at most
//! `cx.max_restarts()` times; one more request fails the pass with
//! [`Error::RerenderLoop`].
//!
//! After the walk, views of `old` missing from the current sequence are
//! released once each. A view whose record now points at a different parent
//! was moved elsewhere in the same root and is left to its new owner.
//!
//! # Failure Modes
//!
//! A render error releases the models built in the failing attempt and
//! propagates. The parent's child list is not written by this function, so
//! the root keeps its last-good state.

use rustc_hash::FxHashSet;
use trellis_core::{Error, ModelId, RenderContext, RenderStep, Result, View, ViewId};
use web_time::Instant;

/// Reconcile `children` under `parent` against the previously rendered
/// `old` children. Returns child models in `children` order.
pub fn reconcile(
    cx: &mut RenderContext<'_>,
    parent: ModelId,
    children: &[View],
    old: &[View],
) -> Result<Vec<ModelId>> {
    let start = Instant::now();
    let before = cx.stats();
    let _span = tracing::debug_span!(
        "trellis.reconcile",
        root = %cx.root(),
        parent = %parent,
        children = children.len(),
        reused = tracing::field::Empty,
        rendered = tracing::field::Empty,
        released = tracing::field::Empty,
        restarts = tracing::field::Empty,
        duration_us = tracing::field::Empty,
    )
    .entered();

    let old_ids: FxHashSet<ViewId> = old.iter().map(|v| v.id()).collect();
    let models = render_children(cx, parent, children, &old_ids)?;

    let current: FxHashSet<ViewId> = children.iter().map(|v| v.id()).collect();
    let mut released = FxHashSet::default();
    for view in old {
        if current.contains(&view.id()) || !released.insert(view.id()) {
            continue;
        }
        let owned_here = view
            .records()
            .get(cx.root())
            .is_some_and(|r| r.parent == Some(parent));
        if owned_here {
            view.cleanup(cx);
        }
    }

    let after = cx.stats();
    let span = tracing::Span::current();
    span.record("reused", after.reused - before.reused);
    span.record("rendered", after.rendered - before.rendered);
    span.record("released", after.released - before.released);
    span.record("restarts", after.restarts - before.restarts);
    span.record("duration_us", start.elapsed().as_micros() as u64);
    Ok(models)
}

fn render_children(
    cx: &mut RenderContext<'_>,
    parent: ModelId,
    children: &[View],
    old: &FxHashSet<ViewId>,
) -> Result<Vec<ModelId>> {
    let root = cx.root();
    let mut restarts = vec![0u32; children.len()];
    'attempt: loop {
        let mut models = Vec::with_capacity(children.len());
        let mut fresh: Vec<&View> = Vec::new();
        for (index, child) in children.iter().enumerate() {
            if old.contains(&child.id())
                && let Some(record) = child.records().get(root)
                && record.parent == Some(parent)
                && cx.doc_ref().contains(record.model)
            {
                cx.note_reused();
                models.push(record.model);
                continue;
            }
            match child.render(cx, Some(parent)) {
                Ok(RenderStep::Model(model)) => {
                    fresh.push(child);
                    models.push(model);
                }
                Ok(RenderStep::Rerender) => {
                    restarts[index] += 1;
                    cx.note_restart();
                    for stale in fresh.drain(..) {
                        stale.cleanup(cx);
                    }
                    if restarts[index] > cx.max_restarts() {
                        return Err(Error::RerenderLoop {
                            index,
                            limit: cx.max_restarts(),
                        });
                    }
                    tracing::debug!(index, view = %child.id(), "child requested rerender");
                    continue 'attempt;
                }
                Err(err) => {
                    for stale in fresh.drain(..) {
                        stale.cleanup(cx);
                    }
                    return Err(err);
                }
            }
        }
        return Ok(models);
    }
}
