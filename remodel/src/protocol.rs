use uuid::Uuid;

use crate::{variant::Variant, RemodelError, Result};

/// Default TCP port served by a model server.
pub const DEFAULT_PORT: u16 = 7174;

/// Width of the big-endian frame length header.
pub const HEADER_LENGTH: usize = 4;

/// Default cap on a single frame payload, compressed or inflated.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Kind tag carried by every payload, after the request id.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    MethodCall = 1,
    MethodReturn = 2,
    EmitSignal = 3,
}

impl MessageKind {
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            1 => MessageKind::MethodCall,
            2 => MessageKind::MethodReturn,
            3 => MessageKind::EmitSignal,
            other => return Err(RemodelError::UnknownKind(other)),
        })
    }
}

/// The closed set of value queries a replica may issue against the
/// authoritative model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Index,
    Parent,
    Sibling,
    RowCount,
    ColumnCount,
    HasChildren,
    Data,
    HeaderData,
    ItemData,
    Flags,
    Buddy,
    CanFetchMore,
    FetchMore,
    Submit,
    RoleNames,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Index => "index",
            Method::Parent => "parent",
            Method::Sibling => "sibling",
            Method::RowCount => "rowCount",
            Method::ColumnCount => "columnCount",
            Method::HasChildren => "hasChildren",
            Method::Data => "data",
            Method::HeaderData => "headerData",
            Method::ItemData => "itemData",
            Method::Flags => "flags",
            Method::Buddy => "buddy",
            Method::CanFetchMore => "canFetchMore",
            Method::FetchMore => "fetchMore",
            Method::Submit => "submit",
            Method::RoleNames => "roleNames",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "index" => Method::Index,
            "parent" => Method::Parent,
            "sibling" => Method::Sibling,
            "rowCount" => Method::RowCount,
            "columnCount" => Method::ColumnCount,
            "hasChildren" => Method::HasChildren,
            "data" => Method::Data,
            "headerData" => Method::HeaderData,
            "itemData" => Method::ItemData,
            "flags" => Method::Flags,
            "buddy" => Method::Buddy,
            "canFetchMore" => Method::CanFetchMore,
            "fetchMore" => Method::FetchMore,
            "submit" => Method::Submit,
            "roleNames" => Method::RoleNames,
            other => return Err(RemodelError::UnknownMethod(other.to_string())),
        })
    }
}

/// The closed set of change signals broadcast by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    DataChanged,
    HeaderDataChanged,
    LayoutAboutToBeChanged,
    LayoutChanged,
    RowsAboutToBeInserted,
    RowsInserted,
    RowsAboutToBeMoved,
    RowsMoved,
    RowsAboutToBeRemoved,
    RowsRemoved,
    ColumnsAboutToBeInserted,
    ColumnsInserted,
    ColumnsAboutToBeMoved,
    ColumnsMoved,
    ColumnsAboutToBeRemoved,
    ColumnsRemoved,
    ModelAboutToBeReset,
    ModelReset,
}

impl SignalKind {
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::DataChanged => "dataChanged",
            SignalKind::HeaderDataChanged => "headerDataChanged",
            SignalKind::LayoutAboutToBeChanged => "layoutAboutToBeChanged",
            SignalKind::LayoutChanged => "layoutChanged",
            SignalKind::RowsAboutToBeInserted => "rowsAboutToBeInserted",
            SignalKind::RowsInserted => "rowsInserted",
            SignalKind::RowsAboutToBeMoved => "rowsAboutToBeMoved",
            SignalKind::RowsMoved => "rowsMoved",
            SignalKind::RowsAboutToBeRemoved => "rowsAboutToBeRemoved",
            SignalKind::RowsRemoved => "rowsRemoved",
            SignalKind::ColumnsAboutToBeInserted => "columnsAboutToBeInserted",
            SignalKind::ColumnsInserted => "columnsInserted",
            SignalKind::ColumnsAboutToBeMoved => "columnsAboutToBeMoved",
            SignalKind::ColumnsMoved => "columnsMoved",
            SignalKind::ColumnsAboutToBeRemoved => "columnsAboutToBeRemoved",
            SignalKind::ColumnsRemoved => "columnsRemoved",
            SignalKind::ModelAboutToBeReset => "modelAboutToBeReset",
            SignalKind::ModelReset => "modelReset",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "dataChanged" => SignalKind::DataChanged,
            "headerDataChanged" => SignalKind::HeaderDataChanged,
            "layoutAboutToBeChanged" => SignalKind::LayoutAboutToBeChanged,
            "layoutChanged" => SignalKind::LayoutChanged,
            "rowsAboutToBeInserted" => SignalKind::RowsAboutToBeInserted,
            "rowsInserted" => SignalKind::RowsInserted,
            "rowsAboutToBeMoved" => SignalKind::RowsAboutToBeMoved,
            "rowsMoved" => SignalKind::RowsMoved,
            "rowsAboutToBeRemoved" => SignalKind::RowsAboutToBeRemoved,
            "rowsRemoved" => SignalKind::RowsRemoved,
            "columnsAboutToBeInserted" => SignalKind::ColumnsAboutToBeInserted,
            "columnsInserted" => SignalKind::ColumnsInserted,
            "columnsAboutToBeMoved" => SignalKind::ColumnsAboutToBeMoved,
            "columnsMoved" => SignalKind::ColumnsMoved,
            "columnsAboutToBeRemoved" => SignalKind::ColumnsAboutToBeRemoved,
            "columnsRemoved" => SignalKind::ColumnsRemoved,
            "modelAboutToBeReset" => SignalKind::ModelAboutToBeReset,
            "modelReset" => SignalKind::ModelReset,
            other => return Err(RemodelError::UnknownSignal(other.to_string())),
        })
    }
}

/// One decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Call {
        id: Uuid,
        method: Method,
        args: Vec<Variant>,
    },
    Return {
        id: Uuid,
        value: Variant,
    },
    Signal {
        id: Uuid,
        signal: SignalKind,
        args: Vec<Variant>,
    },
}

impl Message {
    pub fn id(&self) -> Uuid {
        match self {
            Message::Call { id, .. } | Message::Return { id, .. } | Message::Signal { id, .. } => {
                *id
            }
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Call { .. } => MessageKind::MethodCall,
            Message::Return { .. } => MessageKind::MethodReturn,
            Message::Signal { .. } => MessageKind::EmitSignal,
        }
    }
}
