#![forbid(unsafe_code)]

//! Grid flattening.
//!
//! Converts an arbitrary nesting of row/column groupings into a single grid
//! of positioned cells. Sibling branches of different granularity are
//! aligned on the least common multiple of their extents, so a row holding a
//! two-row column next to a three-row column becomes six rows high and each
//! child is stretched proportionally.
//!
//! # Algorithm
//!
//! Post-order descent. A leaf is one row by one column. A ROW node takes the
//! LCM of its children's row counts and the sum of their column counts (or
//! the fixed column count when one is given); child row coordinates are
//! scaled by `lcm / child_rows` and column coordinates shifted by the running
//! column offset. A COLUMN node is the transpose. Children with zero extent
//! are pruned before the LCM is taken, so a node whose children are all
//! degenerate is itself `(0, 0)` and carries no cells.

use serde::Serialize;
use trellis_core::{Axis, Error, Result};

/// A node of a row/column grouping tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridNode<T> {
    Item(T),
    Row(Vec<GridNode<T>>),
    Column(Vec<GridNode<T>>),
}

/// Unstructured nested list input. Groupings alternate COLUMN / ROW by depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nested<T> {
    Leaf(T),
    List(Vec<Nested<T>>),
}

/// One positioned item of a flattened grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridCell<T> {
    pub item: T,
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

/// Flattened grid with its overall extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatGrid<T> {
    pub nrows: usize,
    pub ncols: usize,
    pub cells: Vec<GridCell<T>>,
}

impl<T> GridNode<T> {
    /// Build a tree from a nested list: the outermost list is a COLUMN, its
    /// inner lists ROWs, and so on alternately.
    #[must_use]
    pub fn from_nested(nested: Nested<T>) -> Self {
        Self::from_nested_at(nested, 0)
    }

    fn from_nested_at(nested: Nested<T>, depth: usize) -> Self {
        match nested {
            Nested::Leaf(item) => Self::Item(item),
            Nested::List(children) => {
                let children = children
                    .into_iter()
                    .map(|c| Self::from_nested_at(c, depth + 1))
                    .collect();
                if depth % 2 == 0 {
                    Self::Column(children)
                } else {
                    Self::Row(children)
                }
            }
        }
    }

    /// Arrange a flat item list into a synthetic tree of the requested shape.
    ///
    /// - `ncols` (with or without `nrows`): a COLUMN of ROWs holding `ncols`
    ///   items each. With both given, more than `nrows * ncols` items is a
    ///   bounds error.
    /// - only `nrows`: a ROW of COLUMNs holding `nrows` items each.
    /// - neither: a single ROW.
    pub fn chunked(items: Vec<T>, nrows: Option<usize>, ncols: Option<usize>) -> Result<Self> {
        let nrows = nrows.filter(|n| *n > 0);
        let ncols = ncols.filter(|n| *n > 0);
        match (nrows, ncols) {
            (rows, Some(cols)) => {
                let needed = items.len().div_ceil(cols);
                if let Some(limit) = rows
                    && needed > limit
                {
                    return Err(Error::Bounds {
                        axis: Axis::Row,
                        start: 0,
                        end: needed,
                        limit,
                    });
                }
                Ok(Self::Column(
                    chunks(items, cols).into_iter().map(Self::Row).collect(),
                ))
            }
            (Some(rows), None) => Ok(Self::Row(
                chunks(items, rows).into_iter().map(Self::Column).collect(),
            )),
            (None, None) => Ok(Self::Row(items.into_iter().map(Self::Item).collect())),
        }
    }
}

fn chunks<T>(items: Vec<T>, size: usize) -> Vec<Vec<GridNode<T>>> {
    let mut out = Vec::with_capacity(items.len().div_ceil(size.max(1)));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(GridNode::Item(item));
        if current.len() == size {
            out.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

pub(crate) const fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

pub(crate) fn lcm(values: impl IntoIterator<Item = usize>) -> usize {
    values
        .into_iter()
        .fold(1, |acc, v| if v == 0 { acc } else { acc / gcd(acc, v) * v })
}

/// Intermediate result: extent plus `(item, r0, c0, r1, c1)` boxes.
struct Partial<T> {
    nrows: usize,
    ncols: usize,
    items: Vec<(T, usize, usize, usize, usize)>,
}

impl<T> Partial<T> {
    const fn empty() -> Self {
        Self {
            nrows: 0,
            ncols: 0,
            items: Vec::new(),
        }
    }

    const fn is_degenerate(&self) -> bool {
        self.nrows == 0 || self.ncols == 0
    }
}

fn flatten_node<T>(node: GridNode<T>, fixed_rows: Option<usize>, fixed_cols: Option<usize>) -> Partial<T> {
    match node {
        GridNode::Item(item) => Partial {
            nrows: 1,
            ncols: 1,
            items: vec![(item, 0, 0, 1, 1)],
        },
        GridNode::Row(children) => {
            let children: Vec<Partial<T>> = children
                .into_iter()
                .map(|c| flatten_node(c, fixed_rows, fixed_cols))
                .filter(|c| !c.is_degenerate())
                .collect();
            if children.is_empty() {
                return Partial::empty();
            }
            let nrows = lcm(children.iter().map(|c| c.nrows));
            let ncols = fixed_cols.unwrap_or_else(|| children.iter().map(|c| c.ncols).sum());
            let mut items = Vec::new();
            let mut offset = 0;
            for child in children {
                let factor = nrows / child.nrows;
                for (item, r0, c0, r1, c1) in child.items {
                    items.push((item, factor * r0, c0 + offset, factor * r1, c1 + offset));
                }
                offset += child.ncols;
            }
            Partial {
                nrows,
                ncols,
                items,
            }
        }
        GridNode::Column(children) => {
            let children: Vec<Partial<T>> = children
                .into_iter()
                .map(|c| flatten_node(c, fixed_rows, fixed_cols))
                .filter(|c| !c.is_degenerate())
                .collect();
            if children.is_empty() {
                return Partial::empty();
            }
            let nrows = fixed_rows.unwrap_or_else(|| children.iter().map(|c| c.nrows).sum());
            let ncols = lcm(children.iter().map(|c| c.ncols));
            let mut items = Vec::new();
            let mut offset = 0;
            for child in children {
                let factor = ncols / child.ncols;
                for (item, r0, c0, r1, c1) in child.items {
                    items.push((item, r0 + offset, factor * c0, r1 + offset, factor * c1));
                }
                offset += child.nrows;
            }
            Partial {
                nrows,
                ncols,
                items,
            }
        }
    }
}

/// Flatten `tree` into positioned cells, with the overall extent.
///
/// `fixed_rows` / `fixed_cols` replace the summed extent of COLUMN / ROW
/// nodes at every level. Zero is treated as "not fixed".
#[must_use]
pub fn flatten_grid<T>(tree: GridNode<T>, fixed_rows: Option<usize>, fixed_cols: Option<usize>) -> FlatGrid<T> {
    let partial = flatten_node(
        tree,
        fixed_rows.filter(|n| *n > 0),
        fixed_cols.filter(|n| *n > 0),
    );
    let cells = partial
        .items
        .into_iter()
        .map(|(item, r0, c0, r1, c1)| GridCell {
            item,
            row: r0,
            col: c0,
            row_span: r1 - r0,
            col_span: c1 - c0,
        })
        .collect();
    FlatGrid {
        nrows: partial.nrows,
        ncols: partial.ncols,
        cells,
    }
}

/// Flatten `tree` into a list of positioned cells.
#[must_use]
pub fn flatten<T>(tree: GridNode<T>, fixed_rows: Option<usize>, fixed_cols: Option<usize>) -> Vec<GridCell<T>> {
    flatten_grid(tree, fixed_rows, fixed_cols).cells
}
