use indexmap::IndexMap;

use crate::{event::Orientation, path::IndexPath, variant::Variant};

/// Data role constants shared between models and replica consumers.
pub mod roles {
    pub const DISPLAY: i32 = 0;
    pub const DECORATION: i32 = 1;
    pub const EDIT: i32 = 2;
    pub const TOOL_TIP: i32 = 3;
    /// First role value free for application-defined roles.
    pub const USER: i32 = 256;
}

/// Item capability bits answered by [`ItemModel::flags`].
pub mod flags {
    pub const SELECTABLE: u32 = 0x01;
    pub const EDITABLE: u32 = 0x02;
    pub const ENABLED: u32 = 0x20;
}

/// The authoritative model a server publishes to its replicas.
///
/// Implementations address cells by [`IndexPath`] and answer value queries
/// with [`Variant`]s. The paths handed in always came off the wire, so an
/// implementation must tolerate paths that no longer resolve (answer zero
/// counts or [`Variant::Null`]) rather than panic.
///
/// Structural changes are announced separately through a
/// [`ModelPublisher`](crate::ModelPublisher); the server never polls.
pub trait ItemModel: Send + 'static {
    fn row_count(&self, parent: &IndexPath) -> u32;

    fn column_count(&self, parent: &IndexPath) -> u32;

    fn has_children(&self, parent: &IndexPath) -> bool {
        self.row_count(parent) > 0 && self.column_count(parent) > 0
    }

    fn data(&self, path: &IndexPath, role: i32) -> Variant;

    fn header_data(&self, section: u32, orientation: Orientation, role: i32) -> Variant {
        let _ = (section, orientation, role);
        Variant::Null
    }

    /// Every non-null role value of one cell.
    fn item_data(&self, path: &IndexPath) -> IndexMap<i32, Variant> {
        self.role_names()
            .keys()
            .filter_map(|role| {
                let value = self.data(path, *role);
                if value.is_null() {
                    None
                } else {
                    Some((*role, value))
                }
            })
            .collect()
    }

    fn flags(&self, path: &IndexPath) -> u32 {
        let _ = path;
        flags::SELECTABLE | flags::ENABLED
    }

    /// The cell that should be edited in place of `path`.
    fn buddy(&self, path: &IndexPath) -> IndexPath {
        path.clone()
    }

    fn can_fetch_more(&self, parent: &IndexPath) -> bool {
        let _ = parent;
        false
    }

    fn fetch_more(&mut self, parent: &IndexPath) {
        let _ = parent;
    }

    fn submit(&mut self) -> bool {
        true
    }

    fn role_names(&self) -> IndexMap<i32, Vec<u8>> {
        IndexMap::from([
            (roles::DISPLAY, b"display".to_vec()),
            (roles::DECORATION, b"decoration".to_vec()),
            (roles::EDIT, b"edit".to_vec()),
            (roles::TOOL_TIP, b"toolTip".to_vec()),
        ])
    }
}
