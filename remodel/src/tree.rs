use crate::path::IndexPath;

/// Stable identifier of a node in a [`ReplicaTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    row: i32,
    column: i32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Client-side mirror of the authoritative hierarchy.
///
/// Nodes live in an arena indexed by [`NodeId`]; the root occupies slot 0
/// with `row = column = -1` and is never destroyed. The children of any node
/// form a dense rectangular grid anchored at `(0, 0)` — every mutation
/// operator re-establishes that invariant and asserts it in debug builds.
pub struct ReplicaTree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl Default for ReplicaTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaTree {
    pub fn new() -> Self {
        ReplicaTree {
            nodes: vec![Some(Node {
                row: -1,
                column: -1,
                parent: None,
                children: Vec::new(),
            })],
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0].as_ref().expect("stale node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0].as_mut().expect("stale node id")
    }

    pub fn row(&self, id: NodeId) -> i32 {
        self.node(id).row
    }

    pub fn column(&self, id: NodeId) -> i32 {
        self.node(id).column
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Number of live nodes, the root excluded.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count() - 1
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.node(id).children.is_empty()
    }

    pub fn row_count(&self, id: NodeId) -> u32 {
        self.node(id)
            .children
            .iter()
            .map(|child| self.node(*child).row + 1)
            .max()
            .unwrap_or(0) as u32
    }

    pub fn column_count(&self, id: NodeId) -> u32 {
        self.node(id)
            .children
            .iter()
            .map(|child| self.node(*child).column + 1)
            .max()
            .unwrap_or(0) as u32
    }

    /// Sibling lookup under `parent`.
    pub fn child(&self, parent: NodeId, row: u32, column: u32) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|id| self.node(*id).row == row as i32 && self.node(*id).column == column as i32)
    }

    /// Descend from the root along `path`.
    pub fn lookup(&self, path: &IndexPath) -> Option<NodeId> {
        let mut id = self.root();
        for (row, column) in path.steps() {
            id = self.child(id, *row, *column)?;
        }
        Some(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn create_child(&mut self, parent: NodeId, row: i32, column: i32) -> NodeId {
        let id = self.alloc(Node {
            row,
            column,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.node_mut(parent).children.push(id);
        id
    }

    fn free_subtree(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
        self.nodes[id.0] = None;
        self.free.push(id.0);
    }

    /// Insert the row block `[first, last]` under `parent`. `columns` is the
    /// effective column count of the parent; the caller resolves it (locally
    /// when siblings exist, remotely otherwise) before applying.
    pub fn apply_rows_inserted(&mut self, parent: NodeId, first: u32, last: u32, columns: u32) {
        let count = (last - first + 1) as i32;
        for id in self.node(parent).children.clone() {
            if self.node(id).row >= first as i32 {
                self.node_mut(id).row += count;
            }
        }
        for row in first..=last {
            for column in 0..columns {
                self.create_child(parent, row as i32, column as i32);
            }
        }
        self.debug_check(parent);
    }

    /// Remove the row block `[first, last]` under `parent`, destroying the
    /// subtree of every removed cell.
    pub fn apply_rows_removed(&mut self, parent: NodeId, first: u32, last: u32) {
        let count = (last - first + 1) as i32;
        let mut kept = Vec::new();
        for id in std::mem::take(&mut self.node_mut(parent).children) {
            let row = self.node(id).row;
            if row >= first as i32 && row <= last as i32 {
                self.free_subtree(id);
            } else {
                if row > last as i32 {
                    self.node_mut(id).row -= count;
                }
                kept.push(id);
            }
        }
        self.node_mut(parent).children = kept;
        self.debug_check(parent);
    }

    /// Move the row block `[first, last]` from `source` to `destination`,
    /// targeting the pre-move row `destination_row` of the destination.
    pub fn apply_rows_moved(
        &mut self,
        source: NodeId,
        first: u32,
        last: u32,
        destination: NodeId,
        destination_row: u32,
    ) {
        let count = last - first + 1;
        let mut moved = Vec::new();
        let mut kept = Vec::new();
        for id in std::mem::take(&mut self.node_mut(source).children) {
            let row = self.node(id).row;
            if row >= first as i32 && row <= last as i32 {
                self.node_mut(id).row = row - first as i32;
                moved.push(id);
            } else {
                if row > last as i32 {
                    self.node_mut(id).row -= count as i32;
                }
                kept.push(id);
            }
        }
        self.node_mut(source).children = kept;

        // a same-parent downward move names its target in pre-move rows
        let insert_at = if source == destination && destination_row > last {
            destination_row - count
        } else {
            destination_row
        };
        for id in self.node(destination).children.clone() {
            if self.node(id).row >= insert_at as i32 {
                self.node_mut(id).row += count as i32;
            }
        }
        for id in moved {
            self.node_mut(id).row += insert_at as i32;
            self.node_mut(id).parent = Some(destination);
            self.node_mut(destination).children.push(id);
        }
        self.debug_check(source);
        self.debug_check(destination);
    }

    /// Column counterpart of [`ReplicaTree::apply_rows_inserted`]; `rows` is
    /// the effective row count resolved by the caller.
    pub fn apply_columns_inserted(&mut self, parent: NodeId, first: u32, last: u32, rows: u32) {
        let count = (last - first + 1) as i32;
        for id in self.node(parent).children.clone() {
            if self.node(id).column >= first as i32 {
                self.node_mut(id).column += count;
            }
        }
        for column in first..=last {
            for row in 0..rows {
                self.create_child(parent, row as i32, column as i32);
            }
        }
        self.debug_check(parent);
    }

    pub fn apply_columns_removed(&mut self, parent: NodeId, first: u32, last: u32) {
        let count = (last - first + 1) as i32;
        let mut kept = Vec::new();
        for id in std::mem::take(&mut self.node_mut(parent).children) {
            let column = self.node(id).column;
            if column >= first as i32 && column <= last as i32 {
                self.free_subtree(id);
            } else {
                if column > last as i32 {
                    self.node_mut(id).column -= count;
                }
                kept.push(id);
            }
        }
        self.node_mut(parent).children = kept;
        self.debug_check(parent);
    }

    pub fn apply_columns_moved(
        &mut self,
        source: NodeId,
        first: u32,
        last: u32,
        destination: NodeId,
        destination_column: u32,
    ) {
        let count = last - first + 1;
        let mut moved = Vec::new();
        let mut kept = Vec::new();
        for id in std::mem::take(&mut self.node_mut(source).children) {
            let column = self.node(id).column;
            if column >= first as i32 && column <= last as i32 {
                self.node_mut(id).column = column - first as i32;
                moved.push(id);
            } else {
                if column > last as i32 {
                    self.node_mut(id).column -= count as i32;
                }
                kept.push(id);
            }
        }
        self.node_mut(source).children = kept;

        let insert_at = if source == destination && destination_column > last {
            destination_column - count
        } else {
            destination_column
        };
        for id in self.node(destination).children.clone() {
            if self.node(id).column >= insert_at as i32 {
                self.node_mut(id).column += count as i32;
            }
        }
        for id in moved {
            self.node_mut(id).column += insert_at as i32;
            self.node_mut(id).parent = Some(destination);
            self.node_mut(destination).children.push(id);
        }
        self.debug_check(source);
        self.debug_check(destination);
    }

    /// Destroy everything but the root.
    pub fn reset(&mut self) {
        let root = self.root();
        for id in std::mem::take(&mut self.node_mut(root).children) {
            self.free_subtree(id);
        }
    }

    /// Whether the children of `id` form a dense rectangular grid anchored
    /// at `(0, 0)`.
    pub fn grid_ok(&self, id: NodeId) -> bool {
        let children = &self.node(id).children;
        if children.is_empty() {
            return true;
        }
        let mut seen = std::collections::HashSet::with_capacity(children.len());
        let mut max_row = 0;
        let mut max_column = 0;
        for child in children {
            let node = self.node(*child);
            if node.row < 0 || node.column < 0 || !seen.insert((node.row, node.column)) {
                return false;
            }
            max_row = max_row.max(node.row);
            max_column = max_column.max(node.column);
        }
        children.len() == ((max_row + 1) * (max_column + 1)) as usize
    }

    fn debug_check(&self, id: NodeId) {
        debug_assert!(
            self.grid_ok(id),
            "children of {id:?} no longer form a rectangular grid"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a flat `rows x columns` grid under the root.
    fn grid(rows: u32, columns: u32) -> ReplicaTree {
        let mut tree = ReplicaTree::new();
        if rows > 0 && columns > 0 {
            let root = tree.root();
            tree.apply_rows_inserted(root, 0, rows - 1, columns);
        }
        tree
    }

    fn snapshot(tree: &ReplicaTree, parent: NodeId) -> Vec<(i32, i32)> {
        let mut cells: Vec<(i32, i32)> = tree
            .node(parent)
            .children
            .iter()
            .map(|id| (tree.node(*id).row, tree.node(*id).column))
            .collect();
        cells.sort_unstable();
        cells
    }

    #[test]
    fn empty_tree() {
        let tree = ReplicaTree::new();
        let root = tree.root();
        assert_eq!(tree.row(root), -1);
        assert_eq!(tree.column(root), -1);
        assert!(!tree.has_children(root));
        assert_eq!(tree.row_count(root), 0);
        assert_eq!(tree.column_count(root), 0);
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn grid_population() {
        let tree = grid(4, 4);
        let root = tree.root();
        assert_eq!(tree.row_count(root), 4);
        assert_eq!(tree.column_count(root), 4);
        assert_eq!(tree.node_count(), 16);
        assert!(tree.grid_ok(root));
        assert!(tree.child(root, 3, 3).is_some());
        assert!(tree.child(root, 4, 0).is_none());
    }

    #[test]
    fn lookup_descends_paths() {
        let mut tree = grid(2, 1);
        let root = tree.root();
        let top = tree.child(root, 1, 0).unwrap();
        tree.apply_rows_inserted(top, 0, 2, 2);
        let path = IndexPath::root().child(1, 0).child(2, 1);
        let id = tree.lookup(&path).unwrap();
        assert_eq!(tree.row(id), 2);
        assert_eq!(tree.column(id), 1);
        assert!(tree.lookup(&IndexPath::root().child(2, 0)).is_none());
    }

    #[test]
    fn insert_shifts_following_rows() {
        let mut tree = grid(4, 4);
        let root = tree.root();
        let old = tree.child(root, 2, 1).unwrap();
        tree.apply_rows_inserted(root, 2, 2, 4);
        assert_eq!(tree.row_count(root), 5);
        assert_eq!(tree.row(old), 3);
        assert!(tree.grid_ok(root));
    }

    #[test]
    fn insert_into_childless_parent_uses_given_columns() {
        let mut tree = grid(1, 1);
        let root = tree.root();
        let cell = tree.child(root, 0, 0).unwrap();
        tree.apply_rows_inserted(cell, 0, 1, 3);
        assert_eq!(tree.row_count(cell), 2);
        assert_eq!(tree.column_count(cell), 3);
    }

    #[test]
    fn remove_destroys_subtrees_and_shifts() {
        let mut tree = grid(4, 2);
        let root = tree.root();
        let nested = tree.child(root, 1, 0).unwrap();
        tree.apply_rows_inserted(nested, 0, 1, 2);
        assert_eq!(tree.node_count(), 12);

        tree.apply_rows_removed(root, 1, 2);
        assert_eq!(tree.row_count(root), 2);
        assert_eq!(tree.node_count(), 4);
        assert_eq!(snapshot(&tree, root), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn insert_then_remove_is_identity() {
        let mut tree = grid(4, 4);
        let root = tree.root();
        let before = snapshot(&tree, root);
        tree.apply_rows_inserted(root, 1, 2, 4);
        tree.apply_rows_removed(root, 1, 2);
        assert_eq!(snapshot(&tree, root), before);

        tree.apply_columns_inserted(root, 0, 1, 4);
        tree.apply_columns_removed(root, 0, 1);
        assert_eq!(snapshot(&tree, root), before);
    }

    #[test]
    fn move_rows_down() {
        let mut tree = grid(4, 1);
        let root = tree.root();
        let row0 = tree.child(root, 0, 0).unwrap();
        let row2 = tree.child(root, 2, 0).unwrap();
        tree.apply_rows_moved(root, 0, 1, root, 4);
        assert_eq!(tree.row(row0), 2);
        assert_eq!(tree.row(row2), 0);
        assert_eq!(tree.row_count(root), 4);
        assert!(tree.grid_ok(root));
    }

    #[test]
    fn move_rows_up() {
        let mut tree = grid(4, 1);
        let root = tree.root();
        let row0 = tree.child(root, 0, 0).unwrap();
        let row3 = tree.child(root, 3, 0).unwrap();
        tree.apply_rows_moved(root, 2, 3, root, 0);
        assert_eq!(tree.row(row3), 1);
        assert_eq!(tree.row(row0), 2);
        assert!(tree.grid_ok(root));
    }

    #[test]
    fn move_to_own_position_is_identity() {
        let mut tree = grid(4, 2);
        let root = tree.root();
        let before = snapshot(&tree, root);
        tree.apply_rows_moved(root, 1, 2, root, 1);
        assert_eq!(snapshot(&tree, root), before);
    }

    #[test]
    fn move_rows_across_parents() {
        let mut tree = grid(2, 1);
        let root = tree.root();
        let left = tree.child(root, 0, 0).unwrap();
        let right = tree.child(root, 1, 0).unwrap();
        tree.apply_rows_inserted(left, 0, 2, 1);
        tree.apply_rows_inserted(right, 0, 0, 1);

        tree.apply_rows_moved(left, 1, 2, right, 0);
        assert_eq!(tree.row_count(left), 1);
        assert_eq!(tree.row_count(right), 3);
        assert!(tree.grid_ok(left));
        assert!(tree.grid_ok(right));
        let moved = tree.child(right, 0, 0).unwrap();
        assert_eq!(tree.parent(moved), Some(right));
    }

    #[test]
    fn move_columns_down() {
        let mut tree = grid(1, 4);
        let root = tree.root();
        let col0 = tree.child(root, 0, 0).unwrap();
        tree.apply_columns_moved(root, 0, 1, root, 4);
        assert_eq!(tree.column(col0), 2);
        assert_eq!(tree.column_count(root), 4);
        assert!(tree.grid_ok(root));
    }

    #[test]
    fn reset_keeps_only_the_root() {
        let mut tree = grid(3, 3);
        let root = tree.root();
        let cell = tree.child(root, 0, 0).unwrap();
        tree.apply_rows_inserted(cell, 0, 1, 1);
        tree.reset();
        assert_eq!(tree.node_count(), 0);
        assert!(!tree.has_children(root));
    }

    #[test]
    fn nested_population_counts() {
        let mut tree = grid(2, 1);
        let root = tree.root();
        for row in 0..2 {
            let cell = tree.child(root, row, 0).unwrap();
            tree.apply_rows_inserted(cell, 0, 2, 2);
        }
        assert_eq!(tree.node_count(), 14);
    }

    #[test]
    fn grid_check_spots_holes() {
        let mut tree = ReplicaTree::new();
        let root = tree.root();
        tree.create_child(root, 0, 0);
        tree.create_child(root, 1, 1);
        assert!(!tree.grid_ok(root));
    }
}
