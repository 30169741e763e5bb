use bytes::{Buf, BufMut};
use uuid::Uuid;

use crate::{
    protocol::{Message, MessageKind, Method, SignalKind},
    variant::{self, Variant},
    RemodelError, Result,
};

/// Encode a message into its uncompressed payload form:
/// `uuid(16 raw bytes) || kind(u8) || body`.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.put_slice(message.id().as_bytes());
    buf.put_u8(message.kind() as u8);
    match message {
        Message::Call { method, args, .. } => {
            variant::put_string(&mut buf, method.name());
            put_args(&mut buf, args);
        }
        Message::Return { value, .. } => value.encode(&mut buf),
        Message::Signal { signal, args, .. } => {
            variant::put_string(&mut buf, signal.name());
            put_args(&mut buf, args);
        }
    }
    buf
}

pub fn decode_message(payload: &[u8]) -> Result<Message> {
    let mut buf = payload;
    variant::need(&buf, 16, "message id")?;
    let mut id = [0u8; 16];
    buf.copy_to_slice(&mut id);
    let id = Uuid::from_bytes(id);
    variant::need(&buf, 1, "message kind")?;
    let kind = MessageKind::from_u8(buf.get_u8())?;
    let message = match kind {
        MessageKind::MethodCall => {
            let method = Method::from_name(&variant::get_string(&mut buf, "method name")?)?;
            let args = get_args(&mut buf)?;
            Message::Call { id, method, args }
        }
        MessageKind::MethodReturn => Message::Return {
            id,
            value: Variant::decode(&mut buf)?,
        },
        MessageKind::EmitSignal => {
            let signal = SignalKind::from_name(&variant::get_string(&mut buf, "signal name")?)?;
            let args = get_args(&mut buf)?;
            Message::Signal { id, signal, args }
        }
    };
    if buf.has_remaining() {
        return Err(RemodelError::malformed(format!(
            "{} trailing bytes after message body",
            buf.remaining()
        )));
    }
    Ok(message)
}

fn put_args(buf: &mut Vec<u8>, args: &[Variant]) {
    buf.put_u32(args.len() as u32);
    for value in args {
        value.encode(buf);
    }
}

fn get_args(buf: &mut &[u8]) -> Result<Vec<Variant>> {
    variant::need(buf, 4, "argument list")?;
    let count = buf.get_u32() as usize;
    if count > buf.remaining() {
        return Err(RemodelError::malformed(format!(
            "argument list claims {count} elements with {} bytes left",
            buf.remaining()
        )));
    }
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        args.push(Variant::decode(buf)?);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::IndexPath;

    fn roundtrip(message: Message) {
        let payload = encode_message(&message);
        assert_eq!(decode_message(&payload).unwrap(), message);
    }

    #[test]
    fn call_roundtrip() {
        roundtrip(Message::Call {
            id: Uuid::new_v4(),
            method: Method::Data,
            args: vec![
                IndexPath::root().child(0, 0).to_variant(),
                Variant::I32(0),
            ],
        });
    }

    #[test]
    fn return_roundtrip() {
        roundtrip(Message::Return {
            id: Uuid::new_v4(),
            value: Variant::String("row 0, column 0".to_string()),
        });
        roundtrip(Message::Return {
            id: Uuid::new_v4(),
            value: Variant::Null,
        });
    }

    #[test]
    fn signal_roundtrip() {
        roundtrip(Message::Signal {
            id: Uuid::new_v4(),
            signal: SignalKind::RowsInserted,
            args: vec![
                IndexPath::root().to_variant(),
                Variant::I32(2),
                Variant::I32(2),
            ],
        });
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut payload = encode_message(&Message::Return {
            id: Uuid::new_v4(),
            value: Variant::Null,
        });
        payload[16] = 9;
        assert!(matches!(
            decode_message(&payload),
            Err(RemodelError::UnknownKind(9))
        ));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let mut payload = Vec::new();
        payload.put_slice(Uuid::new_v4().as_bytes());
        payload.put_u8(MessageKind::MethodCall as u8);
        variant::put_string(&mut payload, "shutdown");
        payload.put_u32(0);
        assert!(matches!(
            decode_message(&payload),
            Err(RemodelError::UnknownMethod(name)) if name == "shutdown"
        ));
    }

    #[test]
    fn unknown_signal_is_rejected() {
        let mut payload = Vec::new();
        payload.put_slice(Uuid::new_v4().as_bytes());
        payload.put_u8(MessageKind::EmitSignal as u8);
        variant::put_string(&mut payload, "modelExploded");
        payload.put_u32(0);
        assert!(matches!(
            decode_message(&payload),
            Err(RemodelError::UnknownSignal(name)) if name == "modelExploded"
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut payload = encode_message(&Message::Return {
            id: Uuid::new_v4(),
            value: Variant::Null,
        });
        payload.push(0);
        assert!(matches!(
            decode_message(&payload),
            Err(RemodelError::Malformed(_))
        ));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            decode_message(&[]),
            Err(RemodelError::Malformed(_))
        ));
    }
}
