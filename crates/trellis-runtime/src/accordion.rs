#![forbid(unsafe_code)]

//! Accordion: named children, each shown inside a collapsible [`Card`].
//!
//! The container's `active` list (indices of expanded cards) and the cards'
//! own `collapsed` flags are kept in sync in both directions. Either side
//! changing triggers an update of the other while `syncing` is set, and the
//! callbacks return early while it is, so one logical update never feeds
//! back into itself.
//!
//! In toggle mode at most one card is expanded: expanding a card collapses
//! every other expanded card.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::json;
use trellis_core::{
    Change, Error, ModelId, PaneRegistry, Props, RenderContext, RenderRecords, RenderStep, Result,
    View, ViewId, Viewable, Watch, Watchers,
};

use crate::base::{ContainerBase, default_label};
use crate::card::Card;
use crate::kinds::default_registry;
use crate::named::{NamedChild, NamedLayout, NamedList};

struct CardSlot {
    object: ViewId,
    card: Rc<Card>,
    _watch: Watch,
}

/// Sets a flag for the lifetime of the guard.
struct Syncing<'a>(&'a Cell<bool>);

impl<'a> Syncing<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self(flag))
    }
}

impl Drop for Syncing<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct Accordion {
    container: ContainerBase,
    me: Weak<Accordion>,
    named: NamedList,
    cards: RefCell<Vec<CardSlot>>,
    active: RefCell<Vec<usize>>,
    toggle: Cell<bool>,
    syncing: Cell<bool>,
}

impl Accordion {
    pub fn new<C: Into<NamedChild>>(children: impl IntoIterator<Item = C>) -> Result<Rc<Self>> {
        Self::with_registry(default_registry(), children)
    }

    pub fn with_registry<C: Into<NamedChild>>(
        registry: Arc<PaneRegistry>,
        children: impl IntoIterator<Item = C>,
    ) -> Result<Rc<Self>> {
        let children = children.into_iter().map(Into::into).collect();
        let named = NamedList::new(registry, children)?;
        let accordion = Rc::new_cyclic(|weak: &Weak<Self>| {
            let me: Weak<dyn Viewable> = weak.clone();
            Self {
                container: ContainerBase::new(me),
                me: weak.clone(),
                named,
                cards: RefCell::new(Vec::new()),
                active: RefCell::new(Vec::new()),
                toggle: Cell::new(false),
                syncing: Cell::new(false),
            }
        });
        accordion.rebuild_cards();
        Ok(accordion)
    }

    #[must_use]
    pub fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }

    #[must_use]
    pub fn objects(&self) -> Vec<View> {
        self.named.objects()
    }

    /// The cards wrapping each child, in child order.
    #[must_use]
    pub fn cards(&self) -> Vec<Rc<Card>> {
        self.cards.borrow().iter().map(|s| Rc::clone(&s.card)).collect()
    }

    /// Indices of the expanded cards, ascending.
    #[must_use]
    pub fn active(&self) -> Vec<usize> {
        self.active.borrow().clone()
    }

    /// Expand exactly the cards at `indices`. In toggle mode only the last
    /// index is kept.
    pub fn set_active(&self, indices: impl IntoIterator<Item = usize>) -> Result<()> {
        let len = self.named.len();
        let mut indices: Vec<usize> = indices.into_iter().collect();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(Error::IndexOutOfRange { index, len });
        }
        if self.toggle.get() && indices.len() > 1 {
            indices = indices.split_off(indices.len() - 1);
        }
        {
            let Some(_guard) = Syncing::enter(&self.syncing) else {
                return Ok(());
            };
            for (i, card) in self.cards().iter().enumerate() {
                card.set_collapsed(!indices.contains(&i));
            }
        }
        self.refresh_active();
        Ok(())
    }

    #[must_use]
    pub fn toggle(&self) -> bool {
        self.toggle.get()
    }

    /// Switch toggle mode. Turning it on keeps only the first expanded card.
    pub fn set_toggle(&self, toggle: bool) -> Result<()> {
        if self.toggle.replace(toggle) == toggle {
            return Ok(());
        }
        self.container.base.notify(Change::Property("toggle"));
        let active = self.active();
        if toggle && active.len() > 1 {
            self.set_active(active.into_iter().take(1))?;
        }
        Ok(())
    }

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
        copy.toggle.set(self.toggle());
        let len = copy.named.len();
        copy.set_active(self.active().into_iter().filter(|&i| i < len))?;
        Ok(copy)
    }

    fn card_views(&self) -> Vec<View> {
        self.cards.borrow().iter().map(|s| s.card.view()).collect()
    }

    /// Align the cards with the current children: reuse by identity, retitle,
    /// wrap new children in fresh collapsed cards.
    fn rebuild_cards(&self) {
        let entries = self.named.snapshot();
        let mut old: FxHashMap<ViewId, CardSlot> = self
            .cards
            .borrow_mut()
            .drain(..)
            .map(|slot| (slot.object, slot))
            .collect();
        let mut next = Vec::with_capacity(entries.objects.len());
        let mut titles = Vec::new();
        for (object, name) in entries.objects.into_iter().zip(entries.names) {
            match old.remove(&object.id()) {
                Some(slot) => {
                    titles.push((Rc::clone(&slot.card), name));
                    next.push(slot);
                }
                None => next.push(self.wrap(object, name)),
            }
        }
        *self.cards.borrow_mut() = next;
        drop(old);
        for (card, title) in titles {
            card.set_title(title);
        }
        self.refresh_active_silently();
    }

    fn wrap(&self, object: View, name: String) -> CardSlot {
        let id = object.id();
        let card = Card::wrapping(Arc::clone(self.named.registry()), name, object);
        let me = self.me.clone();
        let watch = card.watchers().subscribe(move |_, change| {
            if *change == Change::Property("collapsed")
                && let Some(accordion) = me.upgrade()
            {
                accordion.card_toggled(id);
            }
        });
        CardSlot {
            object: id,
            card,
            _watch: watch,
        }
    }

    fn card_toggled(&self, object: ViewId) {
        {
            let Some(_guard) = Syncing::enter(&self.syncing) else {
                return;
            };
            let cards = self.cards();
            let changed = self
                .cards
                .borrow()
                .iter()
                .position(|slot| slot.object == object);
            if let Some(changed) = changed
                && self.toggle.get()
                && !cards[changed].collapsed()
            {
                for (i, card) in cards.iter().enumerate() {
                    if i != changed {
                        card.set_collapsed(true);
                    }
                }
            }
        }
        self.refresh_active();
    }

    fn expanded(&self) -> Vec<usize> {
        self.cards
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.card.collapsed())
            .map(|(i, _)| i)
            .collect()
    }

    fn refresh_active_silently(&self) -> bool {
        let expanded = self.expanded();
        let mut active = self.active.borrow_mut();
        if *active == expanded {
            return false;
        }
        *active = expanded;
        true
    }

    fn refresh_active(&self) {
        if self.refresh_active_silently() {
            self.container.base.notify(Change::Property("active"));
        }
    }

    fn props(&self) -> Props {
        let mut props = Props::new();
        props.insert("names".into(), json!(self.named.names()));
        props.insert("active".into(), json!(self.active()));
        props.insert("toggle".into(), json!(self.toggle()));
        props
    }
}

impl NamedLayout for Accordion {
    fn named(&self) -> &NamedList {
        &self.named
    }

    fn notify(&self, change: Change) {
        self.container.base.notify(change);
    }

    fn entries_changed(&self) {
        self.rebuild_cards();
    }
}

impl Viewable for Accordion {
    fn id(&self) -> ViewId {
        self.container.base.id
    }

    fn type_name(&self) -> &'static str {
        "Accordion"
    }

    fn label(&self) -> String {
        default_label("Accordion", self.container.base.id)
    }

    fn records(&self) -> &RenderRecords {
        &self.container.base.records
    }

    fn watchers(&self) -> &Watchers {
        &self.container.base.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        self.container
            .render(cx, parent, "Accordion", self.props(), &self.card_views())
    }

    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()> {
        self.container
            .apply_change(cx, change, self.props(), &self.card_views())
    }

    fn cleanup(&self, cx: &mut RenderContext<'_>) {
        self.container.cleanup(cx);
    }

    fn objects(&self) -> Vec<View> {
        self.named.objects()
    }

    fn render_children(&self) -> Vec<View> {
        self.card_views()
    }

    fn on_client_change(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        if name != "active" {
            return Ok(());
        }
        let indices = value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|v| v.as_u64().and_then(|i| usize::try_from(i).ok()))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| Error::render("Accordion", format!("active expects indices, got {value}")))?;
        self.set_active(indices)
    }
}

impl fmt::Debug for Accordion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accordion")
            .field("id", &self.container.base.id)
            .field("names", &self.named.names())
            .field("active", &*self.active.borrow())
            .field("toggle", &self.toggle.get())
            .finish()
    }
}
