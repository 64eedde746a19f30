#![forbid(unsafe_code)]

//! Children with display names, kept in lockstep.
//!
//! # Invariants
//!
//! 1. `objects.len() == names.len()` at every point observable from outside:
//!    both sequences live in one cell and are swapped in a single commit.
//! 2. `names[i]` stays attached to the child it was given with; reordering
//!    mutators move the name with its child.
//! 3. A wholesale `set_objects` whose length differs from the current names
//!    rederives them: children found (by identity) in the old sequence keep
//!    their name, new children use their advertised label.

use std::cell::RefCell;
use std::ops::RangeBounds;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use trellis_core::{Change, Child, Error, PaneRegistry, Result, View, ViewId};

use crate::base::ensure_unique;
use crate::list::resolve_range;
use crate::pane::coerce;

/// A child plus an optional explicit name.
#[derive(Debug, Clone)]
pub struct NamedChild {
    pub name: Option<String>,
    pub child: Child,
}

impl NamedChild {
    pub fn unnamed(child: impl Into<Child>) -> Self {
        Self {
            name: None,
            child: child.into(),
        }
    }
}

impl<S: Into<String>, C: Into<Child>> From<(S, C)> for NamedChild {
    fn from((name, child): (S, C)) -> Self {
        Self {
            name: Some(name.into()),
            child: child.into(),
        }
    }
}

impl From<View> for NamedChild {
    fn from(view: View) -> Self {
        Self::unnamed(view)
    }
}

impl From<&View> for NamedChild {
    fn from(view: &View) -> Self {
        Self::unnamed(view)
    }
}

#[doc(hidden)]
#[derive(Debug, Clone, Default)]
pub struct Entries {
    pub(crate) objects: Vec<View>,
    pub(crate) names: Vec<String>,
}

impl Entries {
    fn push(&mut self, view: View, name: String) {
        self.objects.push(view);
        self.names.push(name);
    }
}

pub struct NamedList {
    entries: RefCell<Entries>,
    registry: Arc<PaneRegistry>,
}

impl NamedList {
    pub(crate) fn new(registry: Arc<PaneRegistry>, children: Vec<NamedChild>) -> Result<Self> {
        let mut entries = Entries::default();
        for named in children {
            let (view, name) = resolve(&registry, named)?;
            entries.push(view, name);
        }
        ensure_unique(&entries.objects)?;
        Ok(Self {
            entries: RefCell::new(entries),
            registry,
        })
    }

    pub(crate) fn registry(&self) -> &Arc<PaneRegistry> {
        &self.registry
    }

    pub(crate) fn snapshot(&self) -> Entries {
        self.entries.borrow().clone()
    }

    pub(crate) fn objects(&self) -> Vec<View> {
        self.entries.borrow().objects.clone()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.borrow().names.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().objects.len()
    }

    fn edit<R>(&self, edit: impl FnOnce(&mut Entries) -> Result<R>) -> Result<R> {
        let mut next = self.snapshot();
        let out = edit(&mut next)?;
        ensure_unique(&next.objects)?;
        debug_assert_eq!(next.objects.len(), next.names.len());
        *self.entries.borrow_mut() = next;
        Ok(out)
    }

    fn resolve(&self, named: NamedChild) -> Result<(View, String)> {
        resolve(&self.registry, named)
    }
}

fn resolve(registry: &PaneRegistry, named: NamedChild) -> Result<(View, String)> {
    let view = coerce(registry, named.child)?;
    let name = named.name.unwrap_or_else(|| view.label());
    Ok((view, name))
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::IndexOutOfRange { index, len }
}

/// Layout whose children carry names.
///
/// All mutators are provided, update objects and names in one commit and
/// notify [`Change::Objects`].
pub trait NamedLayout {
    #[doc(hidden)]
    fn named(&self) -> &NamedList;

    #[doc(hidden)]
    fn notify(&self, change: Change);

    /// Hook run after a committed mutation, before watchers are notified.
    #[doc(hidden)]
    fn entries_changed(&self) {}

    #[doc(hidden)]
    fn mutate<R>(&self, edit: impl FnOnce(&NamedList, &mut Entries) -> Result<R>) -> Result<R> {
        let named = self.named();
        let out = named.edit(|next| edit(named, next))?;
        self.entries_changed();
        self.notify(Change::Objects);
        Ok(out)
    }

    fn names(&self) -> Vec<String> {
        self.named().names()
    }

    fn len(&self) -> usize {
        self.named().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<View> {
        self.named().entries.borrow().objects.get(index).cloned()
    }

    fn index_of(&self, view: &View) -> Option<usize> {
        self.named()
            .entries
            .borrow()
            .objects
            .iter()
            .position(|v| v.ptr_eq(view))
    }

    fn append(&self, child: impl Into<NamedChild>) -> Result<View> {
        let child = child.into();
        self.mutate(|list, next| {
            let (view, name) = list.resolve(child)?;
            next.push(view.clone(), name);
            Ok(view)
        })
    }

    fn extend<C: Into<NamedChild>>(&self, children: impl IntoIterator<Item = C>) -> Result<()> {
        let children: Vec<NamedChild> = children.into_iter().map(Into::into).collect();
        self.mutate(|list, next| {
            for child in children {
                let (view, name) = list.resolve(child)?;
                next.push(view, name);
            }
            Ok(())
        })
    }

    fn insert(&self, index: usize, child: impl Into<NamedChild>) -> Result<View> {
        let child = child.into();
        self.mutate(|list, next| {
            if index > next.objects.len() {
                return Err(out_of_range(index, next.objects.len()));
            }
            let (view, name) = list.resolve(child)?;
            next.objects.insert(index, view.clone());
            next.names.insert(index, name);
            Ok(view)
        })
    }

    /// Remove and return the child at `index` with its name.
    fn pop(&self, index: usize) -> Result<(String, View)> {
        self.mutate(|_, next| {
            if index >= next.objects.len() {
                return Err(out_of_range(index, next.objects.len()));
            }
            Ok((next.names.remove(index), next.objects.remove(index)))
        })
    }

    fn remove(&self, view: &View) -> Result<bool> {
        let Some(index) = self.index_of(view) else {
            return Ok(false);
        };
        self.pop(index).map(|_| true)
    }

    fn reverse(&self) -> Result<()> {
        self.mutate(|_, next| {
            next.objects.reverse();
            next.names.reverse();
            Ok(())
        })
    }

    fn clear(&self) -> Result<Vec<View>> {
        self.mutate(|_, next| {
            next.names.clear();
            Ok(std::mem::take(&mut next.objects))
        })
    }

    /// Replace the child (and name) at `index`.
    fn set(&self, index: usize, child: impl Into<NamedChild>) -> Result<View> {
        let child = child.into();
        self.mutate(|list, next| {
            let len = next.objects.len();
            if index >= len {
                return Err(out_of_range(index, len));
            }
            let (view, name) = list.resolve(child)?;
            next.names[index] = name;
            Ok(std::mem::replace(&mut next.objects[index], view))
        })
    }

    /// Replace `range` with `children`, returning the removed views.
    fn splice<C: Into<NamedChild>>(
        &self,
        range: impl RangeBounds<usize>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Vec<View>> {
        let children: Vec<NamedChild> = children.into_iter().map(Into::into).collect();
        self.mutate(|list, next| {
            let range = resolve_range(&range, next.objects.len())?;
            let (views, names): (Vec<View>, Vec<String>) = children
                .into_iter()
                .map(|child| list.resolve(child))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .unzip();
            let _: Vec<String> = next.names.splice(range.clone(), names).collect();
            Ok(next.objects.splice(range, views).collect())
        })
    }

    /// Replace the child sequence wholesale.
    ///
    /// Names are kept as they are when the length is unchanged; otherwise
    /// they are rederived by identity.
    fn set_objects<C: Into<Child>>(&self, children: impl IntoIterator<Item = C>) -> Result<()> {
        let children: Vec<Child> = children.into_iter().map(Into::into).collect();
        self.mutate(|list, next| {
            let views = children
                .into_iter()
                .map(|child| coerce(list.registry(), child))
                .collect::<Result<Vec<_>>>()?;
            if views.len() != next.names.len() {
                let old: FxHashMap<ViewId, String> = next
                    .objects
                    .iter()
                    .zip(next.names.drain(..))
                    .map(|(v, n)| (v.id(), n))
                    .collect();
                next.names = views
                    .iter()
                    .map(|v| old.get(&v.id()).cloned().unwrap_or_else(|| v.label()))
                    .collect();
            }
            next.objects = views;
            Ok(())
        })
    }

    /// Replace every name. The count must match the number of children.
    fn set_names<S: Into<String>>(&self, names: impl IntoIterator<Item = S>) -> Result<()> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.named().edit(|next| {
            if names.len() != next.objects.len() {
                return Err(out_of_range(names.len(), next.objects.len()));
            }
            next.names = names;
            Ok(())
        })?;
        self.entries_changed();
        self.notify(Change::Property("names"));
        Ok(())
    }
}
