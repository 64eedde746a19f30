#![forbid(unsafe_code)]

//! Sparse rectangular assignment.
//!
//! A [`SpanGrid`] maps half-open rectangles to items. Assigning a region that
//! intersects existing entries is governed by [`OverlapMode`]. Overlaps are
//! always computed against the state before the write; under `warn` and
//! `override` every intersecting entry is then removed and the new entry
//! inserted in a single step, after which the automatic bounds are regrown.
//! A range query issued after the call therefore never sees a replaced
//! entry.

use std::fmt::{self, Write as _};
use std::ops::{Bound, RangeBounds};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use trellis_core::{Axis, Error, Result, Warning};

/// Half-open rectangle `[row_start, row_end) x [col_start, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub row_start: usize,
    pub col_start: usize,
    pub row_end: usize,
    pub col_end: usize,
}

impl Span {
    /// Construct a span, rejecting empty extents.
    pub fn new(row_start: usize, col_start: usize, row_end: usize, col_end: usize) -> Result<Self> {
        if row_end <= row_start {
            return Err(Error::Bounds {
                axis: Axis::Row,
                start: row_start,
                end: row_end,
                limit: row_end,
            });
        }
        if col_end <= col_start {
            return Err(Error::Bounds {
                axis: Axis::Column,
                start: col_start,
                end: col_end,
                limit: col_end,
            });
        }
        Ok(Self {
            row_start,
            col_start,
            row_end,
            col_end,
        })
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.row_end - self.row_start
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.col_end - self.col_start
    }

    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.row_start < other.row_end
            && other.row_start < self.row_end
            && self.col_start < other.col_end
            && other.col_start < self.col_end
    }

    #[must_use]
    pub const fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_start && row < self.row_end && col >= self.col_start && col < self.col_end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}, {}:{}]",
            self.row_start, self.row_end, self.col_start, self.col_end
        )
    }
}

/// Policy for assignments that intersect existing entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMode {
    /// Reject the assignment, leaving the grid untouched.
    Error,
    /// Replace intersecting entries and report a warning.
    #[default]
    Warn,
    /// Replace intersecting entries silently.
    Override,
}

impl OverlapMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Override => "override",
        }
    }
}

/// Outcome of a successful [`SpanGrid::assign`].
#[derive(Debug)]
pub struct Assignment<T> {
    pub span: Span,
    /// Entries removed because they intersected `span`, in insertion order.
    pub replaced: Vec<(Span, T)>,
    pub warning: Option<Warning>,
}

/// Sparse grid of spans.
#[derive(Debug, Clone)]
pub struct SpanGrid<T> {
    entries: Vec<(Span, T)>,
    fixed_rows: Option<usize>,
    fixed_cols: Option<usize>,
    nrows: usize,
    ncols: usize,
    mode: OverlapMode,
}

impl<T> Default for SpanGrid<T> {
    fn default() -> Self {
        Self::new(None, None, OverlapMode::default())
    }
}

impl<T> SpanGrid<T> {
    #[must_use]
    pub fn new(fixed_rows: Option<usize>, fixed_cols: Option<usize>, mode: OverlapMode) -> Self {
        let fixed_rows = fixed_rows.filter(|n| *n > 0);
        let fixed_cols = fixed_cols.filter(|n| *n > 0);
        Self {
            entries: Vec::new(),
            fixed_rows,
            fixed_cols,
            nrows: fixed_rows.unwrap_or(0),
            ncols: fixed_cols.unwrap_or(0),
            mode,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> OverlapMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OverlapMode) {
        self.mode = mode;
    }

    #[must_use]
    pub const fn nrows(&self) -> usize {
        self.nrows
    }

    #[must_use]
    pub const fn ncols(&self) -> usize {
        self.ncols
    }

    #[must_use]
    pub const fn fixed_rows(&self) -> Option<usize> {
        self.fixed_rows
    }

    #[must_use]
    pub const fn fixed_cols(&self) -> Option<usize> {
        self.fixed_cols
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(Span, T)] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turn a pair of ranges into a concrete span.
    ///
    /// Unbounded starts default to 0 and unbounded ends to the current row or
    /// column count. On a fixed axis the region must lie inside the limit.
    pub fn resolve_region(
        &self,
        rows: impl RangeBounds<usize>,
        cols: impl RangeBounds<usize>,
    ) -> Result<Span> {
        let (row_start, row_end) = resolve_axis(&rows, self.nrows, self.fixed_rows, Axis::Row)?;
        let (col_start, col_end) = resolve_axis(&cols, self.ncols, self.fixed_cols, Axis::Column)?;
        Span::new(row_start, col_start, row_end, col_end)
    }

    /// Assign `item` to `span`.
    pub fn assign(&mut self, span: Span, item: T) -> Result<Assignment<T>> {
        check_fixed(span.row_start, span.row_end, self.fixed_rows, Axis::Row)?;
        check_fixed(span.col_start, span.col_end, self.fixed_cols, Axis::Column)?;

        let overlapping: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (existing, _))| existing.intersects(&span))
            .map(|(idx, _)| idx)
            .collect();

        let mut warning = None;
        if !overlapping.is_empty() {
            match self.mode {
                OverlapMode::Error => {
                    return Err(Error::Overlap {
                        region: span.to_string(),
                        count: overlapping.len(),
                        detail: self.overlap_detail(span, &overlapping),
                    });
                }
                OverlapMode::Warn => {
                    warning = Some(Warning::Overlap {
                        region: span.to_string(),
                        replaced: overlapping.len(),
                    });
                }
                OverlapMode::Override => {}
            }
        }

        let mut replaced = Vec::with_capacity(overlapping.len());
        let mut kept = Vec::with_capacity(self.entries.len() + 1);
        for (idx, entry) in self.entries.drain(..).enumerate() {
            if overlapping.binary_search(&idx).is_ok() {
                replaced.push(entry);
            } else {
                kept.push(entry);
            }
        }
        kept.push((span, item));
        self.entries = kept;
        self.regrow();

        Ok(Assignment {
            span,
            replaced,
            warning,
        })
    }

    /// Entries intersecting `span`, in insertion order.
    pub fn get_region(&self, span: Span) -> impl Iterator<Item = &(Span, T)> {
        self.entries.iter().filter(move |(s, _)| s.intersects(&span))
    }

    /// The entry covering `(row, col)`, if any.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&(Span, T)> {
        self.entries.iter().find(|(s, _)| s.contains(row, col))
    }

    /// Remove every entry intersecting `span`, returning them.
    pub fn remove_region(&mut self, span: Span) -> Vec<(Span, T)> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|(s, _)| s.intersects(&span));
        self.entries = kept;
        self.regrow();
        removed
    }

    /// Remove every entry matching `pred`.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<(Span, T)> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|(_, item)| pred(item));
        self.entries = kept;
        self.regrow();
        removed
    }

    pub fn clear(&mut self) -> Vec<(Span, T)> {
        let removed = std::mem::take(&mut self.entries);
        self.regrow();
        removed
    }

    /// Per-cell count of covering entries, `nrows x ncols`.
    #[must_use]
    pub fn occupancy(&self) -> Vec<Vec<u32>> {
        let rows = self.nrows;
        let cols = self.ncols;
        let mut counts: FxHashMap<(usize, usize), u32> = FxHashMap::default();
        for (span, _) in &self.entries {
            for r in span.row_start..span.row_end.min(rows) {
                for c in span.col_start..span.col_end.min(cols) {
                    *counts.entry((r, c)).or_default() += 1;
                }
            }
        }
        (0..rows)
            .map(|r| {
                (0..cols)
                    .map(|c| counts.get(&(r, c)).copied().unwrap_or(0))
                    .collect()
            })
            .collect()
    }

    fn regrow(&mut self) {
        self.nrows = self
            .fixed_rows
            .unwrap_or_else(|| self.entries.iter().map(|(s, _)| s.row_end).max().unwrap_or(0));
        self.ncols = self
            .fixed_cols
            .unwrap_or_else(|| self.entries.iter().map(|(s, _)| s.col_end).max().unwrap_or(0));
    }

    /// Text rendering of the overlap: offending spans, then an occupancy map
    /// including the candidate, with `.` for free cells and counts otherwise.
    fn overlap_detail(&self, candidate: Span, overlapping: &[usize]) -> String {
        let mut out = String::new();
        for idx in overlapping {
            let (span, _) = &self.entries[*idx];
            let _ = writeln!(out, "  existing {span}");
        }
        let rows = self.nrows.max(candidate.row_end);
        let cols = self.ncols.max(candidate.col_end);
        for r in 0..rows {
            out.push_str("  ");
            for c in 0..cols {
                let count = self
                    .entries
                    .iter()
                    .map(|(s, _)| s)
                    .chain(std::iter::once(&candidate))
                    .filter(|s| s.contains(r, c))
                    .count();
                match count {
                    0 => out.push('.'),
                    n if n > 9 => out.push('+'),
                    n => out.push(char::from(b'0' + n as u8)),
                }
            }
            out.push('\n');
        }
        out
    }
}

fn resolve_axis(
    range: &impl RangeBounds<usize>,
    current: usize,
    fixed: Option<usize>,
    axis: Axis,
) -> Result<(usize, usize)> {
    let past = |bound: usize| {
        bound.checked_add(1).ok_or(Error::Bounds {
            axis,
            start: bound,
            end: bound,
            limit: fixed.unwrap_or(current),
        })
    };
    let start = match range.start_bound() {
        Bound::Included(s) => *s,
        Bound::Excluded(s) => past(*s)?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(e) => past(*e)?,
        Bound::Excluded(e) => *e,
        Bound::Unbounded => current.max(past(start)?),
    };
    check_fixed(start, end, fixed, axis)?;
    if end <= start {
        return Err(Error::Bounds {
            axis,
            start,
            end,
            limit: fixed.unwrap_or(current),
        });
    }
    Ok((start, end))
}

fn check_fixed(start: usize, end: usize, fixed: Option<usize>, axis: Axis) -> Result<()> {
    if let Some(limit) = fixed
        && (start >= limit || end > limit)
    {
        return Err(Error::Bounds {
            axis,
            start,
            end,
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(r0: usize, c0: usize, r1: usize, c1: usize) -> Span {
        Span::new(r0, c0, r1, c1).expect("non-empty span")
    }

    #[test]
    fn span_rejects_empty_extent() {
        assert!(Span::new(1, 0, 1, 2).is_err());
        assert!(Span::new(0, 3, 1, 2).is_err());
    }

    #[test]
    fn bounds_grow_with_entries() {
        let mut grid = SpanGrid::default();
        assert_eq!((grid.nrows(), grid.ncols()), (0, 0));
        grid.assign(span(0, 0, 2, 3), "a").expect("assign");
        grid.assign(span(4, 1, 5, 2), "b").expect("assign");
        assert_eq!((grid.nrows(), grid.ncols()), (5, 3));
        grid.remove_region(span(4, 0, 5, 3));
        assert_eq!((grid.nrows(), grid.ncols()), (2, 3));
    }

    #[test]
    fn unbounded_ranges_use_current_extent() {
        let mut grid = SpanGrid::default();
        grid.assign(span(0, 0, 3, 4), "a").expect("assign");
        let region = grid.resolve_region(1.., ..2).expect("region");
        assert_eq!(region, span(1, 0, 3, 2));
        let whole = grid.resolve_region(.., ..).expect("region");
        assert_eq!(whole, span(0, 0, 3, 4));
        let single = grid.resolve_region(2..=2, 3..=3).expect("region");
        assert_eq!(single, span(2, 3, 3, 4));
    }

    #[test]
    fn unbounded_end_on_empty_grid_covers_one_cell() {
        let grid: SpanGrid<()> = SpanGrid::default();
        assert_eq!(grid.resolve_region(.., ..).expect("region"), span(0, 0, 1, 1));
    }

    #[test]
    fn bounds_at_usize_max_are_rejected() {
        let grid: SpanGrid<()> = SpanGrid::default();
        assert!(matches!(
            grid.resolve_region(..=usize::MAX, ..),
            Err(Error::Bounds { axis: Axis::Row, .. })
        ));
        assert!(matches!(
            grid.resolve_region(0..1, usize::MAX..),
            Err(Error::Bounds { axis: Axis::Column, .. })
        ));
    }

    #[test]
    fn fixed_bounds_reject_outside_targets() {
        let mut grid = SpanGrid::new(Some(2), Some(2), OverlapMode::Error);
        let err = grid.assign(span(1, 0, 3, 1), "x").err().expect("out of bounds");
        assert!(matches!(err, Error::Bounds { axis: Axis::Row, limit: 2, .. }));
        assert!(grid.resolve_region(0..1, 2..3).is_err());
        assert!(grid.is_empty());
        assert_eq!((grid.nrows(), grid.ncols()), (2, 2));
    }

    #[test]
    fn error_mode_leaves_state_untouched() {
        let mut grid = SpanGrid::new(None, None, OverlapMode::Error);
        grid.assign(span(0, 0, 2, 2), "x").expect("assign");
        let err = grid.assign(span(1, 1, 3, 3), "y").err().expect("overlap");
        match err {
            Error::Overlap { count, detail, .. } => {
                assert_eq!(count, 1);
                assert!(detail.contains("existing [0:2, 0:2]"));
                assert!(detail.contains("  11.\n  121\n  .11\n"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(grid.entries(), &[(span(0, 0, 2, 2), "x")]);
        assert_eq!((grid.nrows(), grid.ncols()), (2, 2));
    }

    #[test]
    fn override_mode_replaces_every_intersecting_entry() {
        let mut grid = SpanGrid::new(None, None, OverlapMode::Override);
        grid.assign(span(0, 0, 2, 2), "x").expect("assign");
        grid.assign(span(0, 2, 1, 3), "z").expect("assign");
        let outcome = grid.assign(span(1, 1, 3, 3), "y").expect("assign");
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.replaced, vec![(span(0, 0, 2, 2), "x")]);
        assert_eq!(
            grid.entries(),
            &[(span(0, 2, 1, 3), "z"), (span(1, 1, 3, 3), "y")]
        );
        assert!(grid.get_region(span(0, 0, 1, 1)).next().is_none());
    }

    #[test]
    fn warn_mode_reports_replacements() {
        let mut grid = SpanGrid::default();
        grid.assign(span(0, 0, 1, 1), "a").expect("assign");
        grid.assign(span(0, 1, 1, 2), "b").expect("assign");
        let outcome = grid.assign(span(0, 0, 1, 2), "c").expect("assign");
        assert_eq!(
            outcome.warning,
            Some(Warning::Overlap {
                region: "[0:1, 0:2]".into(),
                replaced: 2
            })
        );
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn cell_and_occupancy() {
        let mut grid = SpanGrid::default();
        grid.assign(span(0, 0, 1, 2), "wide").expect("assign");
        grid.assign(span(1, 1, 2, 2), "small").expect("assign");
        assert_eq!(grid.cell(0, 1).map(|(_, v)| *v), Some("wide"));
        assert_eq!(grid.cell(1, 0), None);
        assert_eq!(grid.occupancy(), vec![vec![1, 1], vec![0, 1]]);
    }

    #[test]
    fn overlap_mode_parses_snake_case() {
        let mode: OverlapMode = serde_json::from_str("\"override\"").expect("parse");
        assert_eq!(mode, OverlapMode::Override);
        assert_eq!(OverlapMode::default().as_str(), "warn");
    }
}
