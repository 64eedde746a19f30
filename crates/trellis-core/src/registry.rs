#![forbid(unsafe_code)]

//! Pane kind registry and capability resolution.
//!
//! Pane kinds are registered explicitly, in order, when the application
//! starts. Resolution ranks every applicable kind by score and picks the
//! best one:
//!
//! 1. A child that already is a view is returned unchanged.
//! 2. A custom value exposing a conversion hook is resolved through the
//!    hook's result.
//! 3. Kinds with a fixed priority become candidates with that score and are
//!    confirmed lazily; kinds with dynamic priority are asked for a score
//!    right away.
//! 4. Candidates are ranked by score, descending, with registration order
//!    kept among equal scores. The first confirmed candidate wins.

use std::fmt;
use std::sync::Arc;

use crate::document::Props;
use crate::error::{Error, Result};
use crate::id::RootId;
use crate::value::{Hints, Value};
use crate::view::{Child, View};

/// Hard stop for chains of conversion hooks.
pub const MAX_CONVERSION_DEPTH: usize = 32;

/// Answer of an `applies` predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applies {
    No,
    Yes,
    Score(f64),
}

impl Applies {
    #[must_use]
    pub const fn is_applicable(self) -> bool {
        !matches!(self, Self::No)
    }
}

impl From<bool> for Applies {
    fn from(ok: bool) -> Self {
        if ok { Self::Yes } else { Self::No }
    }
}

impl From<Option<f64>> for Applies {
    fn from(score: Option<f64>) -> Self {
        score.map_or(Self::No, Self::Score)
    }
}

/// Result of building a pane's model properties.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildStep {
    Props(Props),
    /// Siblings rendered earlier in this pass are stale.
    Rerender,
}

/// A renderable wrapper type.
pub trait PaneKind: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Fixed priority, or `None` to ask [`PaneKind::applies`] for a
    /// per-value score.
    fn priority(&self) -> Option<f64>;

    fn applies(&self, value: &Value, hints: &Hints) -> Applies;

    /// When `false`, value changes replace the rendered model instead of
    /// mutating it.
    fn supports_inplace_update(&self) -> bool {
        true
    }

    /// Toolkit model kind produced by this pane kind.
    fn model_kind(&self) -> &'static str {
        self.name()
    }

    /// Compute the model properties for `value`.
    fn build(&self, value: &Value) -> Result<BuildStep>;

    /// Free resources held for `value` in `root`. Must be idempotent.
    fn release(&self, _value: &Value, _root: RootId) {}
}

/// Outcome of resolving a child.
pub enum Resolved {
    /// The child already was a view.
    View(View),
    /// The value must be wrapped in a pane of this kind.
    Kind(Arc<dyn PaneKind>, Value),
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(view) => f.debug_tuple("View").field(view).finish(),
            Self::Kind(kind, value) => f
                .debug_tuple("Kind")
                .field(&kind.name())
                .field(value)
                .finish(),
        }
    }
}

/// Ordered table of pane kinds.
#[derive(Clone, Default)]
pub struct PaneRegistry {
    kinds: Vec<Arc<dyn PaneKind>>,
}

impl PaneRegistry {
    #[must_use]
    pub fn builder() -> PaneRegistryBuilder {
        PaneRegistryBuilder::default()
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &Arc<dyn PaneKind>> {
        self.kinds.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn PaneKind>> {
        self.kinds.iter().find(|k| k.name() == name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Resolve a child to a view or to the pane kind that should wrap it.
    pub fn resolve(&self, child: Child, hints: &Hints) -> Result<Resolved> {
        let mut current = child;
        for _ in 0..MAX_CONVERSION_DEPTH {
            let value = match current {
                Child::View(view) => return Ok(Resolved::View(view)),
                Child::Value(value) => value,
            };
            if let Some(converted) = value.as_custom().and_then(|obj| obj.convert()) {
                current = converted;
                continue;
            }
            let kind = self.kind_for(&value, hints)?;
            return Ok(Resolved::Kind(kind, value));
        }
        Err(Error::resolution("conversion chain too deep"))
    }

    /// Select the best registered kind for `value`.
    pub fn kind_for(&self, value: &Value, hints: &Hints) -> Result<Arc<dyn PaneKind>> {
        struct Candidate<'a> {
            score: f64,
            kind: &'a Arc<dyn PaneKind>,
            confirmed: bool,
        }

        let mut candidates = Vec::with_capacity(self.kinds.len());
        for kind in &self.kinds {
            match kind.priority() {
                Some(score) => candidates.push(Candidate {
                    score,
                    kind,
                    confirmed: false,
                }),
                None => match kind.applies(value, hints) {
                    Applies::No => {}
                    Applies::Score(score) => candidates.push(Candidate {
                        score,
                        kind,
                        confirmed: true,
                    }),
                    Applies::Yes => return Err(Error::Registration { kind: kind.name() }),
                },
            }
        }

        // Stable: equal scores keep registration order.
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        for candidate in candidates {
            if candidate.confirmed || candidate.kind.applies(value, hints).is_applicable() {
                tracing::debug!(
                    kind = candidate.kind.name(),
                    score = candidate.score,
                    value_type = value.type_name(),
                    "resolved pane kind"
                );
                return Ok(Arc::clone(candidate.kind));
            }
        }
        Err(Error::resolution(value.type_name()))
    }
}

impl fmt::Debug for PaneRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.kinds.iter().map(|k| k.name()))
            .finish()
    }
}

/// Builder collecting kinds in registration order.
#[derive(Default)]
pub struct PaneRegistryBuilder {
    kinds: Vec<Arc<dyn PaneKind>>,
}

impl PaneRegistryBuilder {
    #[must_use]
    pub fn register(mut self, kind: impl PaneKind) -> Self {
        self.kinds.push(Arc::new(kind));
        self
    }

    #[must_use]
    pub fn register_arc(mut self, kind: Arc<dyn PaneKind>) -> Self {
        self.kinds.push(kind);
        self
    }

    #[must_use]
    pub fn build(self) -> PaneRegistry {
        PaneRegistry { kinds: self.kinds }
    }
}
