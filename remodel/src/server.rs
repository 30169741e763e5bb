use std::collections::HashMap;

use log::{debug, error, info, warn};
use tokio::{
    io::{BufReader, BufWriter},
    net::{TcpListener, TcpStream},
    select,
    sync::mpsc,
};
use uuid::Uuid;

use crate::{
    adapter, codec, compression,
    event::ModelEvent,
    frame::{MessageReader, MessageWriter},
    model::ItemModel,
    protocol::{Message, Method, MAX_FRAME_SIZE},
    variant::Variant,
    RemodelError, Result,
};

/// Options for a model server endpoint.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Cap on a single frame, compressed or inflated.
    pub max_frame_size: usize,
    /// Outbound frames buffered per session. A peer that stays this far
    /// behind the broadcast stream is disconnected rather than allowed to
    /// stall or reorder everyone else.
    pub session_buffer: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            max_frame_size: MAX_FRAME_SIZE,
            session_buffer: 256,
        }
    }
}

enum SessionMessage {
    Request {
        session: u64,
        id: Uuid,
        method: Method,
        args: Vec<Variant>,
    },
    Closed {
        session: u64,
    },
}

struct SessionHandle {
    outbound: mpsc::Sender<Vec<u8>>,
}

/// Publishes one authoritative model to any number of replicas.
///
/// The serve loop owns the model reference and the session table; sessions
/// decode frames on their own tasks and route method calls here, so every
/// model access and every broadcast happens in one place, in order.
pub struct ModelServer<M: ItemModel> {
    model: Option<M>,
    options: ServerOptions,
}

impl<M: ItemModel> ModelServer<M> {
    pub fn new(model: M) -> Self {
        Self::with_options(model, ServerOptions::default())
    }

    pub fn with_options(model: M, options: ServerOptions) -> Self {
        ModelServer {
            model: Some(model),
            options,
        }
    }

    /// Accept replica connections on `listener` and broadcast the change
    /// events arriving on `events`, until the listener fails.
    pub async fn serve(
        mut self,
        listener: TcpListener,
        mut events: mpsc::UnboundedReceiver<ModelEvent>,
    ) -> Result<()> {
        let (inbound_sender, mut inbound) = mpsc::channel(1024);
        let mut sessions: HashMap<u64, SessionHandle> = HashMap::new();
        let mut next_session: u64 = 0;
        let mut events_open = true;
        loop {
            select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let session = next_session;
                    next_session += 1;
                    info!("session {session}: replica connected from {peer}");
                    let (outbound, outbound_receiver) = mpsc::channel(self.options.session_buffer);
                    sessions.insert(session, SessionHandle { outbound });
                    tokio::spawn(run_session(
                        session,
                        stream,
                        self.options.max_frame_size,
                        inbound_sender.clone(),
                        outbound_receiver,
                    ));
                },
                event = events.recv(), if events_open => {
                    match event {
                        Some(event) => self.handle_event(event, &mut sessions),
                        None => events_open = false,
                    }
                },
                Some(message) = inbound.recv() => {
                    self.handle_session_message(message, &mut sessions);
                },
            }
        }
    }

    fn handle_session_message(
        &mut self,
        message: SessionMessage,
        sessions: &mut HashMap<u64, SessionHandle>,
    ) {
        match message {
            SessionMessage::Request {
                session,
                id,
                method,
                args,
            } => {
                let value = match adapter::dispatch(self.model.as_mut(), method, &args) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("session {session}: dropping after bad {} call: {e}", method.name());
                        sessions.remove(&session);
                        return;
                    }
                };
                let payload = match encode(&Message::Return { id, value }) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("session {session}: failed to encode return: {e}");
                        sessions.remove(&session);
                        return;
                    }
                };
                if let Some(handle) = sessions.get(&session) {
                    if !offer(handle, payload) {
                        warn!("session {session}: outbound buffer exhausted, disconnecting");
                        sessions.remove(&session);
                    }
                }
            }
            SessionMessage::Closed { session } => {
                sessions.remove(&session);
                debug!("session {session}: gone");
            }
        }
    }

    fn handle_event(&mut self, event: ModelEvent, sessions: &mut HashMap<u64, SessionHandle>) {
        if let ModelEvent::ModelDestroyed = event {
            warn!("authoritative model destroyed, answering as empty from now on");
            self.model = None;
            return;
        }
        let Some(signal) = event.signal_kind() else {
            return;
        };
        let message = Message::Signal {
            id: Uuid::new_v4(),
            signal,
            args: event.to_args(),
        };
        let payload = match encode(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to encode {} broadcast: {e}", signal.name());
                return;
            }
        };
        sessions.retain(|session, handle| {
            if offer(handle, payload.clone()) {
                true
            } else {
                warn!("session {session}: outbound buffer exhausted, disconnecting");
                false
            }
        });
    }
}

fn encode(message: &Message) -> Result<Vec<u8>> {
    compression::compress_payload(&codec::encode_message(message))
}

fn offer(handle: &SessionHandle, payload: Vec<u8>) -> bool {
    handle.outbound.try_send(payload).is_ok()
}

async fn run_session(
    session: u64,
    stream: TcpStream,
    max_frame_size: usize,
    inbound: mpsc::Sender<SessionMessage>,
    mut outbound: mpsc::Receiver<Vec<u8>>,
) {
    let (read, write) = stream.into_split();
    let mut reader = MessageReader::with_limit(BufReader::new(read), max_frame_size);
    // writes drain on their own task so a slow peer cannot stall inbound
    // dispatch for everyone routed through the serve loop
    let mut writer_task = tokio::spawn(async move {
        let mut writer = MessageWriter::new(BufWriter::new(write));
        while let Some(payload) = outbound.recv().await {
            writer.send_payload(&payload).await?;
        }
        Ok::<(), RemodelError>(())
    });
    let result = loop {
        select! {
            message = reader.receive() => match message {
                Ok(Message::Call { id, method, args }) => {
                    let request = SessionMessage::Request {
                        session,
                        id,
                        method,
                        args,
                    };
                    if inbound.send(request).await.is_err() {
                        break Ok(());
                    }
                }
                Ok(message) => {
                    break Err(RemodelError::malformed(format!(
                        "unexpected {:?} from a replica",
                        message.kind()
                    )))
                }
                Err(RemodelError::TransportClosed) => break Ok(()),
                Err(e) => break Err(e),
            },
            joined = &mut writer_task => {
                match joined {
                    Ok(Ok(())) => break Ok(()),
                    Ok(Err(e)) => break Err(e),
                    Err(e) => break Err(RemodelError::malformed(format!("writer task failed: {e}"))),
                }
            },
        }
    };
    writer_task.abort();
    match result {
        Ok(()) => debug!("session {session}: closed"),
        Err(e) => warn!("session {session}: closing after error: {e}"),
    }
    let _ = inbound.send(SessionMessage::Closed { session }).await;
}
