use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    codec, compression,
    protocol::{Message, HEADER_LENGTH, MAX_FRAME_SIZE},
    RemodelError, Result,
};

/// Reassembles length-prefixed frames from a byte stream and decodes them.
///
/// Partial reads are buffered in the reader itself, so an in-progress
/// `receive` may be dropped (e.g. by `select!`) and resumed without losing
/// bytes. A clean EOF at a frame boundary reports
/// [`RemodelError::TransportClosed`]; EOF inside a frame reports
/// [`RemodelError::Truncated`].
pub struct MessageReader<R> {
    reader: R,
    limit: usize,
    header: [u8; HEADER_LENGTH],
    state: ReadState,
}

enum ReadState {
    Header { filled: usize },
    Payload { buf: Vec<u8>, received: usize },
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_FRAME_SIZE)
    }

    pub fn with_limit(reader: R, limit: usize) -> Self {
        MessageReader {
            reader,
            limit,
            header: [0; HEADER_LENGTH],
            state: ReadState::Header { filled: 0 },
        }
    }

    pub async fn receive(&mut self) -> Result<Message> {
        let compressed = self.read_frame().await?;
        let payload = compression::decompress_payload(&compressed, self.limit)?;
        let message = codec::decode_message(&payload)?;
        trace!("received {message:?}");
        Ok(message)
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        loop {
            match &mut self.state {
                ReadState::Header { filled } => {
                    while *filled < HEADER_LENGTH {
                        let read = self.reader.read(&mut self.header[*filled..]).await?;
                        if read == 0 {
                            return Err(if *filled == 0 {
                                RemodelError::TransportClosed
                            } else {
                                RemodelError::Truncated
                            });
                        }
                        *filled += read;
                    }
                    let length = u32::from_be_bytes(self.header) as usize;
                    if length > self.limit {
                        return Err(RemodelError::Oversize {
                            length,
                            limit: self.limit,
                        });
                    }
                    self.state = ReadState::Payload {
                        buf: vec![0; length],
                        received: 0,
                    };
                }
                ReadState::Payload { buf, received } => {
                    while *received < buf.len() {
                        let read = self.reader.read(&mut buf[*received..]).await?;
                        if read == 0 {
                            return Err(RemodelError::Truncated);
                        }
                        *received += read;
                    }
                    let frame = std::mem::take(buf);
                    self.state = ReadState::Header { filled: 0 };
                    return Ok(frame);
                }
            }
        }
    }
}

/// Writes framed messages: four distinct big-endian header bytes, then the
/// compressed payload, flushed as one unit.
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        MessageWriter { writer }
    }

    pub async fn send(&mut self, message: &Message) -> Result<()> {
        trace!("sending {message:?}");
        let payload = compression::compress_payload(&codec::encode_message(message))?;
        self.send_payload(&payload).await
    }

    /// Write an already compressed payload, for broadcasts encoded once and
    /// fanned out to many sessions.
    pub async fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.writer
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocol::Method, variant::Variant};
    use uuid::Uuid;

    fn message() -> Message {
        Message::Call {
            id: Uuid::new_v4(),
            method: Method::RowCount,
            args: vec![Variant::List(vec![])],
        }
    }

    #[tokio::test]
    async fn roundtrip() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = MessageWriter::new(client);
        let mut reader = MessageReader::new(server);
        let sent = message();
        writer.send(&sent).await.unwrap();
        assert_eq!(reader.receive().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn split_delivery_reassembles() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut reader = MessageReader::new(server);
        let sent = message();
        let payload = compression::compress_payload(&codec::encode_message(&sent)).unwrap();
        let mut wire = (payload.len() as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(&payload);
        let receive = tokio::spawn(async move { reader.receive().await });
        for chunk in wire.chunks(3) {
            client.write_all(chunk).await.unwrap();
            client.flush().await.unwrap();
            tokio::task::yield_now().await;
        }
        assert_eq!(receive.await.unwrap().unwrap(), sent);
    }

    #[tokio::test]
    async fn clean_eof_reports_closed() {
        let (client, server) = tokio::io::duplex(1024);
        drop(client);
        let mut reader = MessageReader::new(server);
        assert!(matches!(
            reader.receive().await,
            Err(RemodelError::TransportClosed)
        ));
    }

    #[tokio::test]
    async fn eof_inside_header_reports_truncated() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&[0, 0]).await.unwrap();
        drop(client);
        let mut reader = MessageReader::new(server);
        assert!(matches!(
            reader.receive().await,
            Err(RemodelError::Truncated)
        ));
    }

    #[tokio::test]
    async fn eof_inside_payload_reports_truncated() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);
        let mut reader = MessageReader::new(server);
        assert!(matches!(
            reader.receive().await,
            Err(RemodelError::Truncated)
        ));
    }

    #[tokio::test]
    async fn oversize_header_is_rejected() {
        let (mut client, server) = tokio::io::duplex(1024);
        client
            .write_all(&(u32::MAX).to_be_bytes())
            .await
            .unwrap();
        let mut reader = MessageReader::new(server);
        assert!(matches!(
            reader.receive().await,
            Err(RemodelError::Oversize { .. })
        ));
    }

    #[tokio::test]
    async fn zero_length_frame_is_malformed() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&0u32.to_be_bytes()).await.unwrap();
        let mut reader = MessageReader::new(server);
        assert!(matches!(
            reader.receive().await,
            Err(RemodelError::Malformed(_))
        ));
    }
}
