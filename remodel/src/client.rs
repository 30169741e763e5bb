use std::collections::{HashMap, VecDeque};

use futures_util::{Stream, StreamExt};
use indexmap::IndexMap;
use log::{debug, error};
use tokio::{
    io::{AsyncRead, AsyncWrite, BufReader, BufWriter},
    net::{TcpStream, ToSocketAddrs},
    select,
    sync::{broadcast, mpsc, oneshot},
};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::{
    event::{ModelEvent, Orientation},
    frame::{MessageReader, MessageWriter},
    path::IndexPath,
    protocol::{Message, Method, MAX_FRAME_SIZE},
    tree::{NodeId, ReplicaTree},
    variant::Variant,
    RemodelError, Result,
};

// Observers that fall this far behind start losing notifications.
const NOTIFICATION_CAPACITY: usize = 256;

struct InnerClient<R, W> {
    input: MessageReader<R>,
    output: MessageWriter<W>,
    tree: ReplicaTree,
    pending: HashMap<Uuid, oneshot::Sender<Result<Variant>>>,
    backlog: VecDeque<Message>,
    notifications: broadcast::Sender<ModelEvent>,
}

enum ClientRequest {
    RowCount {
        parent: IndexPath,
        response: oneshot::Sender<u32>,
    },
    ColumnCount {
        parent: IndexPath,
        response: oneshot::Sender<u32>,
    },
    HasChildren {
        parent: IndexPath,
        response: oneshot::Sender<bool>,
    },
    Index {
        row: u32,
        column: u32,
        parent: IndexPath,
        response: oneshot::Sender<Option<IndexPath>>,
    },
    Call {
        method: Method,
        args: Vec<Variant>,
        response: oneshot::Sender<Result<Variant>>,
    },
}

impl<R, W> InnerClient<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn new(reader: R, writer: W, options: &ClientOptions) -> Self {
        InnerClient {
            input: MessageReader::with_limit(reader, options.max_frame_size),
            output: MessageWriter::new(writer),
            tree: ReplicaTree::new(),
            pending: HashMap::new(),
            backlog: VecDeque::new(),
            notifications: broadcast::channel(NOTIFICATION_CAPACITY).0,
        }
    }

    /// Populate the replica by descending the remote hierarchy. Observers see
    /// the same column/row insertion pairs a live mutation would produce.
    async fn bootstrap(&mut self) -> Result<()> {
        debug!("bootstrapping replica");
        let mut queue = VecDeque::from([IndexPath::root()]);
        while let Some(path) = queue.pop_front() {
            let has_children = self
                .call(Method::HasChildren, vec![path.to_variant()])
                .await?
                .as_bool()?;
            if !has_children {
                continue;
            }
            let rows = self
                .call(Method::RowCount, vec![path.to_variant()])
                .await?
                .as_u32()?;
            let columns = self
                .call(Method::ColumnCount, vec![path.to_variant()])
                .await?
                .as_u32()?;
            if rows == 0 || columns == 0 {
                continue;
            }
            let parent = self.lookup(&path)?;
            self.notify(ModelEvent::ColumnsAboutToBeInserted {
                parent: path.clone(),
                first: 0,
                last: columns - 1,
            });
            self.notify(ModelEvent::ColumnsInserted {
                parent: path.clone(),
                first: 0,
                last: columns - 1,
            });
            self.notify(ModelEvent::RowsAboutToBeInserted {
                parent: path.clone(),
                first: 0,
                last: rows - 1,
            });
            self.tree.apply_rows_inserted(parent, 0, rows - 1, columns);
            self.notify(ModelEvent::RowsInserted {
                parent: path.clone(),
                first: 0,
                last: rows - 1,
            });
            for row in 0..rows {
                for column in 0..columns {
                    queue.push_back(path.child(row, column));
                }
            }
        }
        debug!("replica bootstrap complete, {} nodes", self.tree.node_count());
        Ok(())
    }

    /// Issue a call and wait for its return while the main loop is suspended.
    /// Everything else arriving meanwhile is backlogged and replayed in
    /// arrival order once the caller's mutation has been applied.
    async fn call(&mut self, method: Method, args: Vec<Variant>) -> Result<Variant> {
        let id = Uuid::new_v4();
        self.output.send(&Message::Call { id, method, args }).await?;
        loop {
            match self.input.receive().await? {
                Message::Return { id: returned, value } if returned == id => return Ok(value),
                other => self.backlog.push_back(other),
            }
        }
    }

    fn lookup(&self, path: &IndexPath) -> Result<NodeId> {
        self.tree.lookup(path).ok_or_else(|| {
            RemodelError::malformed(format!("change signal names an unreplicated path {path}"))
        })
    }

    fn notify(&self, event: ModelEvent) {
        // nobody subscribed is fine
        let _ = self.notifications.send(event);
    }

    async fn remote_count(&mut self, method: Method, parent: &IndexPath) -> Result<u32> {
        self.call(method, vec![parent.to_variant()]).await?.as_u32()
    }

    async fn process_message(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Return { id, value } => match self.pending.remove(&id) {
                Some(response) => {
                    response.send(Ok(value)).ok();
                    Ok(())
                }
                None => Err(RemodelError::malformed(format!(
                    "return for unknown request {id}"
                ))),
            },
            Message::Signal { signal, args, .. } => {
                let event = ModelEvent::from_signal(signal, &args)?;
                self.apply_event(event).await
            }
            Message::Call { .. } => Err(RemodelError::malformed(
                "unexpected method call from the server",
            )),
        }
    }

    async fn apply_event(&mut self, event: ModelEvent) -> Result<()> {
        match &event {
            ModelEvent::RowsInserted {
                parent,
                first,
                last,
            } => {
                let id = self.lookup(parent)?;
                let columns = if self.tree.has_children(id) {
                    self.tree.column_count(id)
                } else {
                    self.remote_count(Method::ColumnCount, parent).await?
                };
                self.tree.apply_rows_inserted(id, *first, *last, columns);
            }
            ModelEvent::RowsRemoved {
                parent,
                first,
                last,
            } => {
                let id = self.lookup(parent)?;
                self.tree.apply_rows_removed(id, *first, *last);
            }
            ModelEvent::RowsMoved {
                source,
                first,
                last,
                destination,
                row,
            } => {
                let source = self.lookup(source)?;
                let destination = self.lookup(destination)?;
                self.tree
                    .apply_rows_moved(source, *first, *last, destination, *row);
            }
            ModelEvent::ColumnsInserted {
                parent,
                first,
                last,
            } => {
                let id = self.lookup(parent)?;
                let rows = if self.tree.has_children(id) {
                    self.tree.row_count(id)
                } else {
                    self.remote_count(Method::RowCount, parent).await?
                };
                self.tree.apply_columns_inserted(id, *first, *last, rows);
            }
            ModelEvent::ColumnsRemoved {
                parent,
                first,
                last,
            } => {
                let id = self.lookup(parent)?;
                self.tree.apply_columns_removed(id, *first, *last);
            }
            ModelEvent::ColumnsMoved {
                source,
                first,
                last,
                destination,
                column,
            } => {
                let source = self.lookup(source)?;
                let destination = self.lookup(destination)?;
                self.tree
                    .apply_columns_moved(source, *first, *last, destination, *column);
            }
            ModelEvent::ModelReset => {
                self.tree.reset();
                self.notify(ModelEvent::ModelReset);
                return self.bootstrap().await;
            }
            // the remaining notifications carry no structural change and are
            // forwarded as-is
            _ => {}
        }
        self.notify(event);
        Ok(())
    }

    async fn handle_request(&mut self, request: ClientRequest) -> Result<()> {
        match request {
            ClientRequest::RowCount { parent, response } => {
                let count = self
                    .tree
                    .lookup(&parent)
                    .map(|id| self.tree.row_count(id))
                    .unwrap_or(0);
                response.send(count).ok();
            }
            ClientRequest::ColumnCount { parent, response } => {
                let count = self
                    .tree
                    .lookup(&parent)
                    .map(|id| self.tree.column_count(id))
                    .unwrap_or(0);
                response.send(count).ok();
            }
            ClientRequest::HasChildren { parent, response } => {
                let has = self
                    .tree
                    .lookup(&parent)
                    .map(|id| self.tree.has_children(id))
                    .unwrap_or(false);
                response.send(has).ok();
            }
            ClientRequest::Index {
                row,
                column,
                parent,
                response,
            } => {
                let path = self
                    .tree
                    .lookup(&parent)
                    .and_then(|id| self.tree.child(id, row, column))
                    .map(|_| parent.child(row, column));
                response.send(path).ok();
            }
            ClientRequest::Call {
                method,
                args,
                response,
            } => {
                let id = Uuid::new_v4();
                if self.pending.contains_key(&id) {
                    return Err(RemodelError::DuplicateUuid(id));
                }
                self.output.send(&Message::Call { id, method, args }).await?;
                self.pending.insert(id, response);
            }
        }
        Ok(())
    }

    async fn run_inner(mut self, mut requests: mpsc::Receiver<ClientRequest>) -> Result<()> {
        self.bootstrap().await?;
        loop {
            while let Some(message) = self.backlog.pop_front() {
                self.process_message(message).await?;
            }
            select! {
                request = requests.recv() => {
                    match request {
                        Some(request) => self.handle_request(request).await?,
                        None => return Ok(()),
                    }
                },
                message = self.input.receive() => {
                    self.process_message(message?).await?;
                },
            }
        }
    }

    async fn run(self, requests: mpsc::Receiver<ClientRequest>) {
        if let Err(e) = self.run_inner(requests).await {
            error!("replica session failed: {e}");
        }
    }
}

/// Options for a replica connection.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Cap on a single inbound frame, compressed or inflated.
    pub max_frame_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

/// Handle for a replicated model. Holds an internal reference to the session
/// task and can be freely cloned and sent across tasks.
///
/// Structural queries (`row_count`, `column_count`, `has_children`, `index`,
/// `parent`) answer from the local mirror; everything else is a synchronous
/// call to the server. Change notifications arrive through
/// [`Client::subscribe`] or [`Client::notifications`].
#[derive(Clone)]
pub struct Client {
    sender: mpsc::Sender<ClientRequest>,
    notifications: broadcast::Sender<ModelEvent>,
}

impl Client {
    /// Consumes a reader and writer pair. To be used for exotic transports;
    /// generally prefer [`Client::connect`].
    pub async fn connect_stream(
        read: impl AsyncRead + Unpin + Send + 'static,
        write: impl AsyncWrite + Unpin + Send + 'static,
        options: ClientOptions,
    ) -> Result<Self> {
        Self::start(InnerClient::new(
            BufReader::new(read),
            BufWriter::new(write),
            &options,
        ))
    }

    /// Connects to a model server over plaintext TCP.
    pub async fn connect<A: ToSocketAddrs>(destination: A, options: ClientOptions) -> Result<Self> {
        let (read, write) = TcpStream::connect(destination).await?.into_split();
        Self::connect_stream(read, write, options).await
    }

    fn start<R, W>(inner: InnerClient<R, W>) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let notifications = inner.notifications.clone();
        let (sender, receiver) = mpsc::channel(1024);
        tokio::spawn(inner.run(receiver));
        Ok(Client {
            sender,
            notifications,
        })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ClientRequest,
    ) -> Result<T> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(build(response))
            .await
            .map_err(|_| RemodelError::TransportClosed)?;
        receiver.await.map_err(|_| RemodelError::TransportClosed)
    }

    async fn call(&self, method: Method, args: Vec<Variant>) -> Result<Variant> {
        self.request(|response| ClientRequest::Call {
            method,
            args,
            response,
        })
        .await?
    }

    pub async fn row_count(&self, parent: &IndexPath) -> Result<u32> {
        let parent = parent.clone();
        self.request(|response| ClientRequest::RowCount { parent, response })
            .await
    }

    pub async fn column_count(&self, parent: &IndexPath) -> Result<u32> {
        let parent = parent.clone();
        self.request(|response| ClientRequest::ColumnCount { parent, response })
            .await
    }

    pub async fn has_children(&self, parent: &IndexPath) -> Result<bool> {
        let parent = parent.clone();
        self.request(|response| ClientRequest::HasChildren { parent, response })
            .await
    }

    /// Sibling lookup in the mirror: `None` when `(row, column)` does not
    /// exist under `parent`.
    pub async fn index(
        &self,
        row: u32,
        column: u32,
        parent: &IndexPath,
    ) -> Result<Option<IndexPath>> {
        let parent = parent.clone();
        self.request(|response| ClientRequest::Index {
            row,
            column,
            parent,
            response,
        })
        .await
    }

    /// The path one step up; pure navigation, no I/O.
    pub fn parent(&self, path: &IndexPath) -> Option<IndexPath> {
        path.parent()
    }

    pub async fn data(&self, path: &IndexPath, role: i32) -> Result<Variant> {
        self.call(Method::Data, vec![path.to_variant(), Variant::I32(role)])
            .await
    }

    pub async fn header_data(
        &self,
        section: u32,
        orientation: Orientation,
        role: i32,
    ) -> Result<Variant> {
        self.call(
            Method::HeaderData,
            vec![
                Variant::I32(section as i32),
                Variant::I32(orientation.as_i32()),
                Variant::I32(role),
            ],
        )
        .await
    }

    pub async fn item_data(&self, path: &IndexPath) -> Result<IndexMap<i32, Variant>> {
        let value = self.call(Method::ItemData, vec![path.to_variant()]).await?;
        parse_role_keys(value.as_map()?.iter().map(|(key, value)| (key, value.clone())))
    }

    pub async fn flags(&self, path: &IndexPath) -> Result<u32> {
        Ok(self
            .call(Method::Flags, vec![path.to_variant()])
            .await?
            .as_i32()? as u32)
    }

    pub async fn buddy(&self, path: &IndexPath) -> Result<IndexPath> {
        let value = self.call(Method::Buddy, vec![path.to_variant()]).await?;
        IndexPath::from_variant(&value)
    }

    pub async fn sibling(&self, row: u32, column: u32, path: &IndexPath) -> Result<IndexPath> {
        let value = self
            .call(
                Method::Sibling,
                vec![
                    Variant::I32(row as i32),
                    Variant::I32(column as i32),
                    path.to_variant(),
                ],
            )
            .await?;
        IndexPath::from_variant(&value)
    }

    pub async fn can_fetch_more(&self, parent: &IndexPath) -> Result<bool> {
        self.call(Method::CanFetchMore, vec![parent.to_variant()])
            .await?
            .as_bool()
    }

    pub async fn fetch_more(&self, parent: &IndexPath) -> Result<()> {
        self.call(Method::FetchMore, vec![parent.to_variant()])
            .await?;
        Ok(())
    }

    pub async fn submit(&self) -> Result<bool> {
        self.call(Method::Submit, Vec::new()).await?.as_bool()
    }

    pub async fn role_names(&self) -> Result<IndexMap<i32, Vec<u8>>> {
        let value = self.call(Method::RoleNames, Vec::new()).await?;
        value
            .as_map()?
            .iter()
            .map(|(key, name)| {
                let role = key.parse::<i32>().map_err(|_| {
                    RemodelError::malformed(format!("role key {key:?} is not a number"))
                })?;
                Ok((role, name.as_bytes()?.to_vec()))
            })
            .collect()
    }

    /// Receive the replica's change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.notifications.subscribe()
    }

    /// The notifications as a stream; lagged gaps are skipped silently.
    pub fn notifications(&self) -> impl Stream<Item = ModelEvent> {
        BroadcastStream::new(self.subscribe()).filter_map(|event| async move { event.ok() })
    }

    /// true if the session task has shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

fn parse_role_keys<'a>(
    entries: impl Iterator<Item = (&'a String, Variant)>,
) -> Result<IndexMap<i32, Variant>> {
    entries
        .map(|(key, value)| {
            let role = key
                .parse::<i32>()
                .map_err(|_| RemodelError::malformed(format!("role key {key:?} is not a number")))?;
            Ok((role, value))
        })
        .collect()
}
