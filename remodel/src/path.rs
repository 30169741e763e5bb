use std::fmt;

use crate::{variant::Variant, RemodelError, Result};

/// Address of a replicated node: the ordered `(row, column)` steps from the
/// invisible root down to the node. The empty path is the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexPath {
    steps: Vec<(u32, u32)>,
}

impl IndexPath {
    pub fn root() -> Self {
        IndexPath::default()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// The `(row, column)` steps, root-most first.
    pub fn steps(&self) -> &[(u32, u32)] {
        &self.steps
    }

    /// The final `(row, column)` step, `None` for the root.
    pub fn last(&self) -> Option<(u32, u32)> {
        self.steps.last().copied()
    }

    pub fn child(&self, row: u32, column: u32) -> IndexPath {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend_from_slice(&self.steps);
        steps.push((row, column));
        IndexPath { steps }
    }

    /// The path one step up, `None` for the root.
    pub fn parent(&self) -> Option<IndexPath> {
        if self.steps.is_empty() {
            return None;
        }
        Some(IndexPath {
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    /// Wire form: a list of points, `x` carrying the column and `y` the row.
    pub fn to_variant(&self) -> Variant {
        Variant::List(
            self.steps
                .iter()
                .map(|(row, column)| Variant::Point {
                    x: *column as i32,
                    y: *row as i32,
                })
                .collect(),
        )
    }

    /// Decode a path variant. A null variant addresses the root, matching
    /// peers that send an unset value for an invalid index.
    pub fn from_variant(value: &Variant) -> Result<IndexPath> {
        let items = match value {
            Variant::Null => return Ok(IndexPath::root()),
            other => other.as_list()?,
        };
        let mut steps = Vec::with_capacity(items.len());
        for item in items {
            let (x, y) = match item {
                Variant::Point { x, y } => (*x, *y),
                other => {
                    return Err(RemodelError::malformed(format!(
                        "index path step is not a point: {other:?}"
                    )))
                }
            };
            if x < 0 || y < 0 {
                return Err(RemodelError::malformed(format!(
                    "index path step ({y}, {x}) is negative"
                )));
            }
            steps.push((y as u32, x as u32));
        }
        Ok(IndexPath { steps })
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "/");
        }
        for (row, column) in &self.steps {
            write!(f, "/({row},{column})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation() {
        let root = IndexPath::root();
        assert!(root.is_root());
        assert_eq!(root.parent(), None);

        let path = root.child(1, 0).child(2, 3);
        assert_eq!(path.depth(), 2);
        assert_eq!(path.last(), Some((2, 3)));
        assert_eq!(path.parent(), Some(root.child(1, 0)));
        assert_eq!(path.steps(), &[(1, 0), (2, 3)]);
    }

    #[test]
    fn variant_roundtrip() {
        for path in [
            IndexPath::root(),
            IndexPath::root().child(0, 0),
            IndexPath::root().child(3, 1).child(0, 2),
        ] {
            assert_eq!(IndexPath::from_variant(&path.to_variant()).unwrap(), path);
        }
    }

    #[test]
    fn null_decodes_to_root() {
        assert_eq!(
            IndexPath::from_variant(&Variant::Null).unwrap(),
            IndexPath::root()
        );
    }

    #[test]
    fn negative_step_is_rejected() {
        let value = Variant::List(vec![Variant::Point { x: -1, y: 0 }]);
        assert!(matches!(
            IndexPath::from_variant(&value),
            Err(RemodelError::Malformed(_))
        ));
    }

    #[test]
    fn non_point_step_is_rejected() {
        let value = Variant::List(vec![Variant::I32(4)]);
        assert!(matches!(
            IndexPath::from_variant(&value),
            Err(RemodelError::Malformed(_))
        ));
    }
}
