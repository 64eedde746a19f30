#![forbid(unsafe_code)]

//! Ordered child lists.
//!
//! [`ObjectList`] is the storage behind every list-shaped layout. Mutators
//! build the candidate sequence first, validate it (coercion, duplicate
//! identity, layout-specific limits) and only then commit, so a failed call
//! leaves the list untouched. Layouts expose the mutators through the
//! [`ListLayout`] trait, which notifies watchers after each commit.

use std::cell::RefCell;
use std::ops::{Bound, Range, RangeBounds};
use std::sync::Arc;

use trellis_core::{Change, Child, Error, PaneRegistry, Result, View};

use crate::base::ensure_unique;
use crate::pane::coerce;

pub struct ObjectList {
    objects: RefCell<Vec<View>>,
    registry: Arc<PaneRegistry>,
}

impl ObjectList {
    pub(crate) fn new(registry: Arc<PaneRegistry>, objects: Vec<View>) -> Result<Self> {
        ensure_unique(&objects)?;
        Ok(Self {
            objects: RefCell::new(objects),
            registry,
        })
    }

    /// List holding exactly `view`.
    pub(crate) fn single(registry: Arc<PaneRegistry>, view: View) -> Self {
        Self {
            objects: RefCell::new(vec![view]),
            registry,
        }
    }

    pub(crate) fn coerce_all<C: Into<Child>>(
        registry: &PaneRegistry,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Vec<View>> {
        children
            .into_iter()
            .map(|child| coerce(registry, child.into()))
            .collect()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PaneRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<View> {
        self.objects.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<View> {
        self.objects.borrow().get(index).cloned()
    }

    #[must_use]
    pub fn index_of(&self, view: &View) -> Option<usize> {
        self.objects.borrow().iter().position(|v| v.ptr_eq(view))
    }

    /// Apply `edit` to a copy of the list and commit it if `validate` and the
    /// duplicate check accept the result.
    pub(crate) fn edit<R>(
        &self,
        validate: impl FnOnce(&[View]) -> Result<()>,
        edit: impl FnOnce(&mut Vec<View>) -> Result<R>,
    ) -> Result<R> {
        let mut next = self.snapshot();
        let out = edit(&mut next)?;
        ensure_unique(&next)?;
        validate(&next)?;
        *self.objects.borrow_mut() = next;
        Ok(out)
    }

    pub(crate) fn coerce(&self, child: Child) -> Result<View> {
        coerce(&self.registry, child)
    }
}

/// Resolve a range against a sequence of length `len`.
pub(crate) fn resolve_range(range: &impl RangeBounds<usize>, len: usize) -> Result<Range<usize>> {
    let past = |bound: usize| {
        bound
            .checked_add(1)
            .ok_or(Error::IndexOutOfRange { index: bound, len })
    };
    let start = match range.start_bound() {
        Bound::Included(s) => *s,
        Bound::Excluded(s) => past(*s)?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(e) => past(*e)?,
        Bound::Excluded(e) => *e,
        Bound::Unbounded => len,
    };
    if start > end || end > len {
        return Err(Error::IndexOutOfRange {
            index: start.max(end),
            len,
        });
    }
    Ok(start..end)
}

/// List-shaped layout: children in an ordered sequence.
///
/// Implementors provide storage and the container plumbing; every mutator
/// is provided and fires [`Change::Objects`] on success.
pub trait ListLayout {
    #[doc(hidden)]
    fn list(&self) -> &ObjectList;

    /// Deliver `change` to this layout's watchers.
    #[doc(hidden)]
    fn notify(&self, change: Change);

    /// Layout-specific acceptance check for a candidate child sequence.
    #[doc(hidden)]
    fn validate_objects(&self, _objects: &[View]) -> Result<()> {
        Ok(())
    }

    /// Hook run after a committed mutation, before watchers are notified.
    #[doc(hidden)]
    fn objects_changed(&self) {}

    #[doc(hidden)]
    fn mutate<R>(&self, edit: impl FnOnce(&ObjectList, &mut Vec<View>) -> Result<R>) -> Result<R> {
        let list = self.list();
        let out = list.edit(|next| self.validate_objects(next), |next| edit(list, next))?;
        self.objects_changed();
        self.notify(Change::Objects);
        Ok(out)
    }

    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    fn get(&self, index: usize) -> Option<View> {
        self.list().get(index)
    }

    fn get_range(&self, range: impl RangeBounds<usize>) -> Result<Vec<View>> {
        let objects = self.list().snapshot();
        let range = resolve_range(&range, objects.len())?;
        Ok(objects[range].to_vec())
    }

    fn index_of(&self, view: &View) -> Option<usize> {
        self.list().index_of(view)
    }

    fn append(&self, child: impl Into<Child>) -> Result<View> {
        let child = child.into();
        self.mutate(|list, next| {
            let view = list.coerce(child)?;
            next.push(view.clone());
            Ok(view)
        })
    }

    fn extend<C: Into<Child>>(&self, children: impl IntoIterator<Item = C>) -> Result<()> {
        let children: Vec<Child> = children.into_iter().map(Into::into).collect();
        self.mutate(|list, next| {
            for child in children {
                next.push(list.coerce(child)?);
            }
            Ok(())
        })
    }

    fn insert(&self, index: usize, child: impl Into<Child>) -> Result<View> {
        let child = child.into();
        self.mutate(|list, next| {
            if index > next.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    len: next.len(),
                });
            }
            let view = list.coerce(child)?;
            next.insert(index, view.clone());
            Ok(view)
        })
    }

    fn pop(&self, index: usize) -> Result<View> {
        self.mutate(|_, next| {
            if index >= next.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    len: next.len(),
                });
            }
            Ok(next.remove(index))
        })
    }

    /// Remove `view`. Returns `false` if it is not a child.
    fn remove(&self, view: &View) -> Result<bool> {
        let Some(index) = self.index_of(view) else {
            return Ok(false);
        };
        self.pop(index).map(|_| true)
    }

    fn reverse(&self) -> Result<()> {
        self.mutate(|_, next| {
            next.reverse();
            Ok(())
        })
    }

    fn clear(&self) -> Result<Vec<View>> {
        self.mutate(|_, next| Ok(std::mem::take(next)))
    }

    /// Replace the child at `index`.
    fn set(&self, index: usize, child: impl Into<Child>) -> Result<View> {
        let child = child.into();
        self.mutate(|list, next| {
            let len = next.len();
            let slot = next
                .get_mut(index)
                .ok_or(Error::IndexOutOfRange { index, len })?;
            let view = list.coerce(child)?;
            Ok(std::mem::replace(slot, view))
        })
    }

    /// Replace `range` with `children`, returning the removed views.
    fn splice<C: Into<Child>>(
        &self,
        range: impl RangeBounds<usize>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Vec<View>> {
        let children: Vec<Child> = children.into_iter().map(Into::into).collect();
        self.mutate(|list, next| {
            let range = resolve_range(&range, next.len())?;
            let views = children
                .into_iter()
                .map(|child| list.coerce(child))
                .collect::<Result<Vec<_>>>()?;
            Ok(next.splice(range, views).collect())
        })
    }

    /// Replace the whole sequence.
    fn set_objects<C: Into<Child>>(&self, children: impl IntoIterator<Item = C>) -> Result<()> {
        let children: Vec<Child> = children.into_iter().map(Into::into).collect();
        self.mutate(|list, next| {
            *next = children
                .into_iter()
                .map(|child| list.coerce(child))
                .collect::<Result<Vec<_>>>()?;
            Ok(())
        })
    }
}
