#![forbid(unsafe_code)]

//! GridBox: a list layout placed on a uniform grid.
//!
//! Children are positioned by flattening. A flat list is chunked by the
//! configured `nrows` / `ncols`; a box built from nested lists keeps that
//! nesting (alternating column and row by depth) until the first structural
//! mutation turns it into a flat list.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;
use trellis_core::{
    Axis, Change, Child, Error, ModelId, PaneRegistry, Props, RenderContext, RenderRecords,
    RenderStep, Result, View, ViewId, Viewable, Watchers,
};
use trellis_layout::{FlatGrid, GridNode, Nested, flatten_grid};

use crate::base::{ContainerBase, default_label, new_cyclic};
use crate::kinds::default_registry;
use crate::list::{ListLayout, ObjectList};
use crate::pane::coerce;

pub struct GridBox {
    container: ContainerBase,
    list: ObjectList,
    nrows: Option<usize>,
    ncols: Option<usize>,
    /// Nesting of child indices, when built from nested lists.
    nesting: RefCell<Option<GridNode<usize>>>,
}

impl GridBox {
    pub fn new<C: Into<Child>>(
        children: impl IntoIterator<Item = C>,
        nrows: Option<usize>,
        ncols: Option<usize>,
    ) -> Result<Rc<Self>> {
        Self::with_registry(default_registry(), children, nrows, ncols)
    }

    pub fn with_registry<C: Into<Child>>(
        registry: Arc<PaneRegistry>,
        children: impl IntoIterator<Item = C>,
        nrows: Option<usize>,
        ncols: Option<usize>,
    ) -> Result<Rc<Self>> {
        let nrows = nrows.filter(|n| *n > 0);
        let ncols = ncols.filter(|n| *n > 0);
        let objects = ObjectList::coerce_all(&registry, children)?;
        check_capacity(objects.len(), nrows, ncols)?;
        let list = ObjectList::new(registry, objects)?;
        Ok(Self::assemble(list, nrows, ncols, None))
    }

    /// Build from nested lists: the outer list is a column of rows, each
    /// row a list of columns, and so on.
    pub fn from_nested(nested: Nested<Child>) -> Result<Rc<Self>> {
        let registry = default_registry();
        let mut objects = Vec::new();
        let nesting = index_nested(nested, &registry, &mut objects)?;
        let list = ObjectList::new(registry, objects)?;
        Ok(Self::assemble(
            list,
            None,
            None,
            Some(GridNode::from_nested(nesting)),
        ))
    }

    fn assemble(
        list: ObjectList,
        nrows: Option<usize>,
        ncols: Option<usize>,
        nesting: Option<GridNode<usize>>,
    ) -> Rc<Self> {
        new_cyclic(|me| Self {
            container: ContainerBase::new(me),
            list,
            nrows,
            ncols,
            nesting: RefCell::new(nesting),
        })
    }

    #[must_use]
    pub fn view(self: &Rc<Self>) -> View {
        View::new(Rc::clone(self) as Rc<dyn Viewable>)
    }

    #[must_use]
    pub const fn nrows(&self) -> Option<usize> {
        self.nrows
    }

    #[must_use]
    pub const fn ncols(&self) -> Option<usize> {
        self.ncols
    }

    #[must_use]
    pub fn objects(&self) -> Vec<View> {
        self.list.snapshot()
    }

    /// Current placement of every child, by index into the child list.
    pub fn layout(&self) -> Result<FlatGrid<usize>> {
        let tree = match self.nesting.borrow().clone() {
            Some(tree) => tree,
            None => GridNode::chunked((0..self.list.len()).collect(), self.nrows, self.ncols)?,
        };
        Ok(flatten_grid(tree, self.nrows, self.ncols))
    }

    pub fn clone_with(&self, objects: Option<Vec<Child>>) -> Result<Rc<Self>> {
        match objects {
            Some(children) => {
                Self::with_registry(Arc::clone(self.list.registry()), children, self.nrows, self.ncols)
            }
            None => {
                let list = ObjectList::new(Arc::clone(self.list.registry()), self.list.snapshot())?;
                Ok(Self::assemble(
                    list,
                    self.nrows,
                    self.ncols,
                    self.nesting.borrow().clone(),
                ))
            }
        }
    }

    fn props(&self) -> Result<Props> {
        let grid = self.layout()?;
        let mut positions = vec![serde_json::Value::Null; self.list.len()];
        for cell in &grid.cells {
            if let Some(slot) = positions.get_mut(cell.item) {
                *slot = json!([cell.row, cell.col, cell.row_span, cell.col_span]);
            }
        }
        let mut props = Props::new();
        props.insert("name".into(), json!(self.label()));
        props.insert("nrows".into(), json!(grid.nrows));
        props.insert("ncols".into(), json!(grid.ncols));
        props.insert("positions".into(), serde_json::Value::Array(positions));
        Ok(props)
    }
}

fn index_nested(
    nested: Nested<Child>,
    registry: &PaneRegistry,
    objects: &mut Vec<View>,
) -> Result<Nested<usize>> {
    match nested {
        Nested::Leaf(child) => {
            objects.push(coerce(registry, child)?);
            Ok(Nested::Leaf(objects.len() - 1))
        }
        Nested::List(children) => Ok(Nested::List(
            children
                .into_iter()
                .map(|c| index_nested(c, registry, objects))
                .collect::<Result<_>>()?,
        )),
    }
}

fn check_capacity(len: usize, nrows: Option<usize>, ncols: Option<usize>) -> Result<()> {
    // A product past `usize::MAX` holds any list.
    if let (Some(rows), Some(cols)) = (nrows, ncols)
        && rows.checked_mul(cols).is_some_and(|capacity| len > capacity)
    {
        return Err(Error::Bounds {
            axis: Axis::Row,
            start: 0,
            end: len.div_ceil(cols),
            limit: rows,
        });
    }
    Ok(())
}

impl ListLayout for GridBox {
    fn list(&self) -> &ObjectList {
        &self.list
    }

    fn notify(&self, change: Change) {
        self.container.base.notify(change);
    }

    fn validate_objects(&self, objects: &[View]) -> Result<()> {
        check_capacity(objects.len(), self.nrows, self.ncols)
    }

    fn objects_changed(&self) {
        self.nesting.borrow_mut().take();
    }
}

impl Viewable for GridBox {
    fn id(&self) -> ViewId {
        self.container.base.id
    }

    fn type_name(&self) -> &'static str {
        "GridBox"
    }

    fn label(&self) -> String {
        default_label("GridBox", self.container.base.id)
    }

    fn records(&self) -> &RenderRecords {
        &self.container.base.records
    }

    fn watchers(&self) -> &Watchers {
        &self.container.base.watchers
    }

    fn render(&self, cx: &mut RenderContext<'_>, parent: Option<ModelId>) -> Result<RenderStep> {
        self.container
            .render(cx, parent, "GridBox", self.props()?, &self.list.snapshot())
    }

    fn apply_change(&self, cx: &mut RenderContext<'_>, change: &Change) -> Result<()> {
        self.container
            .apply_change(cx, change, self.props()?, &self.list.snapshot())
    }

    fn cleanup(&self, cx: &mut RenderContext<'_>) {
        self.container.cleanup(cx);
    }

    fn objects(&self) -> Vec<View> {
        self.list.snapshot()
    }
}

impl fmt::Debug for GridBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridBox")
            .field("id", &self.container.base.id)
            .field("nrows", &self.nrows)
            .field("ncols", &self.ncols)
            .field("objects", &self.list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Document, RootId};

    #[test]
    fn ncols_chunks_rows() {
        let grid = GridBox::new(["a", "b", "c", "d", "e"], None, Some(2)).expect("grid");
        let layout = grid.layout().expect("layout");
        assert_eq!((layout.nrows, layout.ncols), (3, 2));
        assert_eq!((layout.cells[4].row, layout.cells[4].col), (2, 0));
    }

    #[test]
    fn capacity_is_enforced_on_mutation() {
        let grid = GridBox::new(["a", "b", "c", "d"], Some(2), Some(2)).expect("grid");
        let err = grid.append("e").err().expect("full");
        assert!(matches!(err, Error::Bounds { limit: 2, .. }));
        assert_eq!(grid.len(), 4);
        assert!(GridBox::new([1, 2, 3], Some(1), Some(2)).is_err());
    }

    #[test]
    fn huge_shape_accepts_any_list() {
        let grid = GridBox::new(["a", "b", "c"], Some(usize::MAX), Some(2)).expect("grid");
        grid.append("d").expect("room to spare");
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn nested_input_keeps_structure_until_mutated() {
        let nested = Nested::List(vec![
            Nested::List(vec![Nested::Leaf(Child::from("a")), Nested::Leaf(Child::from("b"))]),
            Nested::List(vec![
                Nested::Leaf(Child::from("c")),
                Nested::Leaf(Child::from("d")),
                Nested::Leaf(Child::from("e")),
            ]),
        ]);
        let grid = GridBox::from_nested(nested).expect("grid");
        let layout = grid.layout().expect("layout");
        assert_eq!((layout.nrows, layout.ncols), (2, 6));
        assert_eq!(layout.cells[0].col_span, 3);

        grid.reverse().expect("reverse");
        let layout = grid.layout().expect("layout");
        assert_eq!((layout.nrows, layout.ncols), (1, 5));
    }

    #[test]
    fn positions_are_published_as_props() {
        let grid = GridBox::new(["a", "b", "c"], None, Some(2)).expect("grid");
        let mut doc = Document::new(RootId::MIN);
        let mut cx = RenderContext::new(&mut doc);
        let model = grid.view().get_root(&mut cx).expect("renders");
        drop(cx);
        assert_eq!(doc.prop(model, "positions"), Some(&json!([[0, 0, 1, 1], [0, 1, 1, 1], [1, 0, 1, 1]])));
        assert_eq!(doc.children(model).len(), 3);
    }
}
