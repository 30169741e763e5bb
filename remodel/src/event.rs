use crate::{
    path::IndexPath,
    protocol::SignalKind,
    variant::{arg, Variant},
    RemodelError, Result,
};

/// Header orientation, in its wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal = 1,
    Vertical = 2,
}

impl Orientation {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            1 => Orientation::Horizontal,
            2 => Orientation::Vertical,
            other => {
                return Err(RemodelError::malformed(format!(
                    "orientation {other} is neither horizontal nor vertical"
                )))
            }
        })
    }
}

/// A change notification flowing from the authoritative model to replicas.
///
/// The same type serves both directions: the server encodes events into
/// signal broadcasts, the client decodes signals back into events, applies
/// them, and forwards them to its observers. [`ModelEvent::ModelDestroyed`]
/// is the one purely server-local event; it has no signal form.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    DataChanged {
        top_left: IndexPath,
        bottom_right: IndexPath,
        roles: Vec<i32>,
    },
    HeaderDataChanged {
        orientation: Orientation,
        first: u32,
        last: u32,
    },
    LayoutAboutToBeChanged,
    LayoutChanged,
    RowsAboutToBeInserted {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    RowsInserted {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    RowsAboutToBeMoved {
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        row: u32,
    },
    RowsMoved {
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        row: u32,
    },
    RowsAboutToBeRemoved {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    RowsRemoved {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    ColumnsAboutToBeInserted {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    ColumnsInserted {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    ColumnsAboutToBeMoved {
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        column: u32,
    },
    ColumnsMoved {
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        column: u32,
    },
    ColumnsAboutToBeRemoved {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    ColumnsRemoved {
        parent: IndexPath,
        first: u32,
        last: u32,
    },
    ModelAboutToBeReset,
    ModelReset,
    ModelDestroyed,
}

impl ModelEvent {
    /// The wire signal carrying this event, `None` for server-local events.
    pub fn signal_kind(&self) -> Option<SignalKind> {
        Some(match self {
            ModelEvent::DataChanged { .. } => SignalKind::DataChanged,
            ModelEvent::HeaderDataChanged { .. } => SignalKind::HeaderDataChanged,
            ModelEvent::LayoutAboutToBeChanged => SignalKind::LayoutAboutToBeChanged,
            ModelEvent::LayoutChanged => SignalKind::LayoutChanged,
            ModelEvent::RowsAboutToBeInserted { .. } => SignalKind::RowsAboutToBeInserted,
            ModelEvent::RowsInserted { .. } => SignalKind::RowsInserted,
            ModelEvent::RowsAboutToBeMoved { .. } => SignalKind::RowsAboutToBeMoved,
            ModelEvent::RowsMoved { .. } => SignalKind::RowsMoved,
            ModelEvent::RowsAboutToBeRemoved { .. } => SignalKind::RowsAboutToBeRemoved,
            ModelEvent::RowsRemoved { .. } => SignalKind::RowsRemoved,
            ModelEvent::ColumnsAboutToBeInserted { .. } => SignalKind::ColumnsAboutToBeInserted,
            ModelEvent::ColumnsInserted { .. } => SignalKind::ColumnsInserted,
            ModelEvent::ColumnsAboutToBeMoved { .. } => SignalKind::ColumnsAboutToBeMoved,
            ModelEvent::ColumnsMoved { .. } => SignalKind::ColumnsMoved,
            ModelEvent::ColumnsAboutToBeRemoved { .. } => SignalKind::ColumnsAboutToBeRemoved,
            ModelEvent::ColumnsRemoved { .. } => SignalKind::ColumnsRemoved,
            ModelEvent::ModelAboutToBeReset => SignalKind::ModelAboutToBeReset,
            ModelEvent::ModelReset => SignalKind::ModelReset,
            ModelEvent::ModelDestroyed => return None,
        })
    }

    pub fn to_args(&self) -> Vec<Variant> {
        match self {
            ModelEvent::DataChanged {
                top_left,
                bottom_right,
                roles,
            } => vec![
                top_left.to_variant(),
                bottom_right.to_variant(),
                Variant::List(roles.iter().map(|role| Variant::I32(*role)).collect()),
            ],
            ModelEvent::HeaderDataChanged {
                orientation,
                first,
                last,
            } => vec![
                Variant::I32(orientation.as_i32()),
                Variant::I32(*first as i32),
                Variant::I32(*last as i32),
            ],
            ModelEvent::LayoutAboutToBeChanged
            | ModelEvent::LayoutChanged
            | ModelEvent::ModelAboutToBeReset
            | ModelEvent::ModelReset
            | ModelEvent::ModelDestroyed => Vec::new(),
            ModelEvent::RowsAboutToBeInserted {
                parent,
                first,
                last,
            }
            | ModelEvent::RowsInserted {
                parent,
                first,
                last,
            }
            | ModelEvent::RowsAboutToBeRemoved {
                parent,
                first,
                last,
            }
            | ModelEvent::RowsRemoved {
                parent,
                first,
                last,
            }
            | ModelEvent::ColumnsAboutToBeInserted {
                parent,
                first,
                last,
            }
            | ModelEvent::ColumnsInserted {
                parent,
                first,
                last,
            }
            | ModelEvent::ColumnsAboutToBeRemoved {
                parent,
                first,
                last,
            }
            | ModelEvent::ColumnsRemoved {
                parent,
                first,
                last,
            } => vec![
                parent.to_variant(),
                Variant::I32(*first as i32),
                Variant::I32(*last as i32),
            ],
            ModelEvent::RowsAboutToBeMoved {
                source,
                first,
                last,
                destination,
                row,
            }
            | ModelEvent::RowsMoved {
                source,
                first,
                last,
                destination,
                row,
            } => vec![
                source.to_variant(),
                Variant::I32(*first as i32),
                Variant::I32(*last as i32),
                destination.to_variant(),
                Variant::I32(*row as i32),
            ],
            ModelEvent::ColumnsAboutToBeMoved {
                source,
                first,
                last,
                destination,
                column,
            }
            | ModelEvent::ColumnsMoved {
                source,
                first,
                last,
                destination,
                column,
            } => vec![
                source.to_variant(),
                Variant::I32(*first as i32),
                Variant::I32(*last as i32),
                destination.to_variant(),
                Variant::I32(*column as i32),
            ],
        }
    }

    pub fn from_signal(signal: SignalKind, args: &[Variant]) -> Result<ModelEvent> {
        Ok(match signal {
            SignalKind::DataChanged => {
                let top_left = IndexPath::from_variant(arg(args, 0)?)?;
                let bottom_right = IndexPath::from_variant(arg(args, 1)?)?;
                let roles = arg(args, 2)?
                    .as_list()?
                    .iter()
                    .map(|role| role.as_i32())
                    .collect::<Result<Vec<i32>>>()?;
                ModelEvent::DataChanged {
                    top_left,
                    bottom_right,
                    roles,
                }
            }
            SignalKind::HeaderDataChanged => {
                let orientation = Orientation::from_i32(arg(args, 0)?.as_i32()?)?;
                let first = arg(args, 1)?.as_u32()?;
                let last = arg(args, 2)?.as_u32()?;
                ModelEvent::HeaderDataChanged {
                    orientation,
                    first,
                    last,
                }
            }
            SignalKind::LayoutAboutToBeChanged => ModelEvent::LayoutAboutToBeChanged,
            SignalKind::LayoutChanged => ModelEvent::LayoutChanged,
            SignalKind::RowsAboutToBeInserted => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::RowsAboutToBeInserted {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::RowsInserted => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::RowsInserted {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::RowsAboutToBeMoved => {
                let (source, first, last, destination, row) = move_args(args)?;
                ModelEvent::RowsAboutToBeMoved {
                    source,
                    first,
                    last,
                    destination,
                    row,
                }
            }
            SignalKind::RowsMoved => {
                let (source, first, last, destination, row) = move_args(args)?;
                ModelEvent::RowsMoved {
                    source,
                    first,
                    last,
                    destination,
                    row,
                }
            }
            SignalKind::RowsAboutToBeRemoved => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::RowsAboutToBeRemoved {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::RowsRemoved => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::RowsRemoved {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::ColumnsAboutToBeInserted => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::ColumnsAboutToBeInserted {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::ColumnsInserted => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::ColumnsInserted {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::ColumnsAboutToBeMoved => {
                let (source, first, last, destination, column) = move_args(args)?;
                ModelEvent::ColumnsAboutToBeMoved {
                    source,
                    first,
                    last,
                    destination,
                    column,
                }
            }
            SignalKind::ColumnsMoved => {
                let (source, first, last, destination, column) = move_args(args)?;
                ModelEvent::ColumnsMoved {
                    source,
                    first,
                    last,
                    destination,
                    column,
                }
            }
            SignalKind::ColumnsAboutToBeRemoved => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::ColumnsAboutToBeRemoved {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::ColumnsRemoved => {
                let (parent, first, last) = range_args(args)?;
                ModelEvent::ColumnsRemoved {
                    parent,
                    first,
                    last,
                }
            }
            SignalKind::ModelAboutToBeReset => ModelEvent::ModelAboutToBeReset,
            SignalKind::ModelReset => ModelEvent::ModelReset,
        })
    }
}

fn range_args(args: &[Variant]) -> Result<(IndexPath, u32, u32)> {
    let parent = IndexPath::from_variant(arg(args, 0)?)?;
    let first = arg(args, 1)?.as_u32()?;
    let last = arg(args, 2)?.as_u32()?;
    if last < first {
        return Err(RemodelError::malformed(format!(
            "inverted range [{first}, {last}]"
        )));
    }
    Ok((parent, first, last))
}

fn move_args(args: &[Variant]) -> Result<(IndexPath, u32, u32, IndexPath, u32)> {
    let (source, first, last) = range_args(args)?;
    let destination = IndexPath::from_variant(arg(args, 3)?)?;
    let target = arg(args, 4)?.as_u32()?;
    Ok((source, first, last, destination, target))
}
