use indexmap::IndexMap;
use log::debug;
use tokio::sync::mpsc;

use crate::{
    event::{ModelEvent, Orientation},
    model::ItemModel,
    path::IndexPath,
    protocol::Method,
    variant::{arg, Variant},
    Result,
};

/// Handle through which the authoritative model announces its changes.
///
/// Clone it freely; every method enqueues one [`ModelEvent`] on the channel a
/// [`ModelServer`](crate::ModelServer) consumes, preserving emission order.
/// Announcements follow the usual contract: the `about_to_be` form goes out
/// before the model mutates, the past-tense form after.
#[derive(Clone)]
pub struct ModelPublisher {
    events: mpsc::UnboundedSender<ModelEvent>,
}

impl ModelPublisher {
    /// Create a publisher and the event stream to hand to a server.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ModelEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (ModelPublisher { events }, receiver)
    }

    pub fn emit(&self, event: ModelEvent) {
        if self.events.send(event).is_err() {
            debug!("model event dropped, no server is listening");
        }
    }

    pub fn data_changed(&self, top_left: IndexPath, bottom_right: IndexPath, roles: Vec<i32>) {
        self.emit(ModelEvent::DataChanged {
            top_left,
            bottom_right,
            roles,
        });
    }

    pub fn header_data_changed(&self, orientation: Orientation, first: u32, last: u32) {
        self.emit(ModelEvent::HeaderDataChanged {
            orientation,
            first,
            last,
        });
    }

    pub fn layout_about_to_be_changed(&self) {
        self.emit(ModelEvent::LayoutAboutToBeChanged);
    }

    pub fn layout_changed(&self) {
        self.emit(ModelEvent::LayoutChanged);
    }

    pub fn rows_about_to_be_inserted(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::RowsAboutToBeInserted {
            parent,
            first,
            last,
        });
    }

    pub fn rows_inserted(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::RowsInserted {
            parent,
            first,
            last,
        });
    }

    pub fn rows_about_to_be_moved(
        &self,
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        row: u32,
    ) {
        self.emit(ModelEvent::RowsAboutToBeMoved {
            source,
            first,
            last,
            destination,
            row,
        });
    }

    pub fn rows_moved(
        &self,
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        row: u32,
    ) {
        self.emit(ModelEvent::RowsMoved {
            source,
            first,
            last,
            destination,
            row,
        });
    }

    pub fn rows_about_to_be_removed(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::RowsAboutToBeRemoved {
            parent,
            first,
            last,
        });
    }

    pub fn rows_removed(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::RowsRemoved {
            parent,
            first,
            last,
        });
    }

    pub fn columns_about_to_be_inserted(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::ColumnsAboutToBeInserted {
            parent,
            first,
            last,
        });
    }

    pub fn columns_inserted(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::ColumnsInserted {
            parent,
            first,
            last,
        });
    }

    pub fn columns_about_to_be_moved(
        &self,
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        column: u32,
    ) {
        self.emit(ModelEvent::ColumnsAboutToBeMoved {
            source,
            first,
            last,
            destination,
            column,
        });
    }

    pub fn columns_moved(
        &self,
        source: IndexPath,
        first: u32,
        last: u32,
        destination: IndexPath,
        column: u32,
    ) {
        self.emit(ModelEvent::ColumnsMoved {
            source,
            first,
            last,
            destination,
            column,
        });
    }

    pub fn columns_about_to_be_removed(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::ColumnsAboutToBeRemoved {
            parent,
            first,
            last,
        });
    }

    pub fn columns_removed(&self, parent: IndexPath, first: u32, last: u32) {
        self.emit(ModelEvent::ColumnsRemoved {
            parent,
            first,
            last,
        });
    }

    pub fn model_about_to_be_reset(&self) {
        self.emit(ModelEvent::ModelAboutToBeReset);
    }

    pub fn model_reset(&self) {
        self.emit(ModelEvent::ModelReset);
    }

    /// Tell the server its model is gone. Subsequent queries answer as if
    /// the model were empty. Never broadcast to replicas.
    pub fn model_destroyed(&self) {
        self.emit(ModelEvent::ModelDestroyed);
    }
}

/// Answer one method call against the model. `None` means the model was
/// destroyed: counts answer zero, predicates false, values null.
pub(crate) fn dispatch<M: ItemModel>(
    model: Option<&mut M>,
    method: Method,
    args: &[Variant],
) -> Result<Variant> {
    let Some(model) = model else {
        return Ok(absent_answer(method));
    };
    Ok(match method {
        Method::Index => {
            let row = arg(args, 0)?.as_u32()?;
            let column = arg(args, 1)?.as_u32()?;
            let parent = IndexPath::from_variant(arg(args, 2)?)?;
            if row < model.row_count(&parent) && column < model.column_count(&parent) {
                parent.child(row, column).to_variant()
            } else {
                Variant::Null
            }
        }
        Method::Parent => {
            let child = IndexPath::from_variant(arg(args, 0)?)?;
            child.parent().unwrap_or_default().to_variant()
        }
        Method::Sibling => {
            let row = arg(args, 0)?.as_u32()?;
            let column = arg(args, 1)?.as_u32()?;
            let path = IndexPath::from_variant(arg(args, 2)?)?;
            match path.parent() {
                Some(parent)
                    if row < model.row_count(&parent) && column < model.column_count(&parent) =>
                {
                    parent.child(row, column).to_variant()
                }
                _ => IndexPath::root().to_variant(),
            }
        }
        Method::RowCount => {
            let parent = IndexPath::from_variant(arg(args, 0)?)?;
            Variant::I32(model.row_count(&parent) as i32)
        }
        Method::ColumnCount => {
            let parent = IndexPath::from_variant(arg(args, 0)?)?;
            Variant::I32(model.column_count(&parent) as i32)
        }
        Method::HasChildren => {
            let parent = IndexPath::from_variant(arg(args, 0)?)?;
            Variant::Bool(model.has_children(&parent))
        }
        Method::Data => {
            let path = IndexPath::from_variant(arg(args, 0)?)?;
            let role = arg(args, 1)?.as_i32()?;
            model.data(&path, role)
        }
        Method::HeaderData => {
            let section = arg(args, 0)?.as_u32()?;
            let orientation = Orientation::from_i32(arg(args, 1)?.as_i32()?)?;
            let role = arg(args, 2)?.as_i32()?;
            model.header_data(section, orientation, role)
        }
        Method::ItemData => {
            let path = IndexPath::from_variant(arg(args, 0)?)?;
            Variant::Map(
                model
                    .item_data(&path)
                    .into_iter()
                    .map(|(role, value)| (role.to_string(), value))
                    .collect(),
            )
        }
        Method::Flags => {
            let path = IndexPath::from_variant(arg(args, 0)?)?;
            Variant::I32(model.flags(&path) as i32)
        }
        Method::Buddy => {
            let path = IndexPath::from_variant(arg(args, 0)?)?;
            model.buddy(&path).to_variant()
        }
        Method::CanFetchMore => {
            let parent = IndexPath::from_variant(arg(args, 0)?)?;
            Variant::Bool(model.can_fetch_more(&parent))
        }
        Method::FetchMore => {
            let parent = IndexPath::from_variant(arg(args, 0)?)?;
            model.fetch_more(&parent);
            Variant::Null
        }
        Method::Submit => Variant::Bool(model.submit()),
        Method::RoleNames => Variant::Map(
            model
                .role_names()
                .into_iter()
                .map(|(role, name)| (role.to_string(), Variant::Bytes(name)))
                .collect(),
        ),
    })
}

fn absent_answer(method: Method) -> Variant {
    match method {
        Method::RowCount | Method::ColumnCount => Variant::I32(0),
        Method::HasChildren | Method::CanFetchMore | Method::Submit => Variant::Bool(false),
        Method::ItemData | Method::RoleNames => Variant::Map(IndexMap::new()),
        _ => Variant::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::roles;

    struct Pair;

    impl ItemModel for Pair {
        fn row_count(&self, parent: &IndexPath) -> u32 {
            if parent.is_root() {
                2
            } else {
                0
            }
        }

        fn column_count(&self, parent: &IndexPath) -> u32 {
            if parent.is_root() {
                1
            } else {
                0
            }
        }

        fn data(&self, path: &IndexPath, role: i32) -> Variant {
            match (path.last(), role) {
                (Some((row, 0)), roles::DISPLAY) => Variant::String(format!("item {row}")),
                _ => Variant::Null,
            }
        }
    }

    fn call(method: Method, args: Vec<Variant>) -> Variant {
        dispatch(Some(&mut Pair), method, &args).unwrap()
    }

    #[test]
    fn structural_queries() {
        let root = IndexPath::root().to_variant();
        assert_eq!(call(Method::RowCount, vec![root.clone()]), Variant::I32(2));
        assert_eq!(
            call(Method::ColumnCount, vec![root.clone()]),
            Variant::I32(1)
        );
        assert_eq!(call(Method::HasChildren, vec![root]), Variant::Bool(true));
    }

    #[test]
    fn index_validates_bounds() {
        let root = IndexPath::root().to_variant();
        assert_eq!(
            call(
                Method::Index,
                vec![Variant::I32(1), Variant::I32(0), root.clone()]
            ),
            IndexPath::root().child(1, 0).to_variant()
        );
        assert_eq!(
            call(Method::Index, vec![Variant::I32(2), Variant::I32(0), root]),
            Variant::Null
        );
    }

    #[test]
    fn data_and_item_data() {
        let path = IndexPath::root().child(1, 0).to_variant();
        assert_eq!(
            call(Method::Data, vec![path.clone(), Variant::I32(roles::DISPLAY)]),
            Variant::String("item 1".to_string())
        );
        let map = call(Method::ItemData, vec![path]);
        assert_eq!(
            map.as_map().unwrap().get("0"),
            Some(&Variant::String("item 1".to_string()))
        );
    }

    #[test]
    fn destroyed_model_answers_empty() {
        let root = IndexPath::root().to_variant();
        let gone: Option<&mut Pair> = None;
        assert_eq!(
            dispatch(gone, Method::RowCount, &[root.clone()]).unwrap(),
            Variant::I32(0)
        );
        let gone: Option<&mut Pair> = None;
        assert_eq!(
            dispatch(gone, Method::HasChildren, &[root.clone()]).unwrap(),
            Variant::Bool(false)
        );
        let gone: Option<&mut Pair> = None;
        assert_eq!(
            dispatch(gone, Method::Data, &[root, Variant::I32(0)]).unwrap(),
            Variant::Null
        );
    }

    #[test]
    fn missing_arguments_are_malformed() {
        assert!(dispatch(Some(&mut Pair), Method::Data, &[]).is_err());
    }
}
