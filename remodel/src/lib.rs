mod adapter;
mod client;
mod codec;
mod compression;
mod errors;
mod event;
mod frame;
mod model;
mod path;
mod protocol;
mod server;
mod tree;
mod variant;

pub use adapter::ModelPublisher;
pub use client::{Client, ClientOptions};
pub use errors::{RemodelError, Result};
pub use event::{ModelEvent, Orientation};
pub use frame::{MessageReader, MessageWriter};
pub use model::{flags, roles, ItemModel};
pub use path::IndexPath;
pub use protocol::{Message, MessageKind, Method, SignalKind, DEFAULT_PORT, MAX_FRAME_SIZE};
pub use server::{ModelServer, ServerOptions};
pub use tree::{NodeId, ReplicaTree};
pub use variant::Variant;

pub use uuid::Uuid;
