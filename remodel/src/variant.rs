use bytes::{Buf, BufMut};
use indexmap::IndexMap;

use crate::{RemodelError, Result};

mod tag {
    pub const NULL: u8 = 0;
    pub const I32: u8 = 1;
    pub const I64: u8 = 2;
    pub const BOOL: u8 = 3;
    pub const STRING: u8 = 4;
    pub const BYTES: u8 = 5;
    pub const POINT: u8 = 6;
    pub const LIST: u8 = 7;
    pub const MAP: u8 = 8;
}

/// Self-describing tagged value, the protocol's universal data carrier.
///
/// Index paths travel as a [`Variant::List`] of [`Variant::Point`]s, root-most
/// step first, with `x` holding the column and `y` the row.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Null,
    I32(i32),
    I64(i64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    Point { x: i32, y: i32 },
    List(Vec<Variant>),
    Map(IndexMap<String, Variant>),
}

impl Variant {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Variant::Null => buf.put_u8(tag::NULL),
            Variant::I32(value) => {
                buf.put_u8(tag::I32);
                buf.put_i32(*value);
            }
            Variant::I64(value) => {
                buf.put_u8(tag::I64);
                buf.put_i64(*value);
            }
            Variant::Bool(value) => {
                buf.put_u8(tag::BOOL);
                buf.put_u8(*value as u8);
            }
            Variant::String(value) => {
                buf.put_u8(tag::STRING);
                put_string(buf, value);
            }
            Variant::Bytes(value) => {
                buf.put_u8(tag::BYTES);
                put_bytes(buf, value);
            }
            Variant::Point { x, y } => {
                buf.put_u8(tag::POINT);
                buf.put_i32(*x);
                buf.put_i32(*y);
            }
            Variant::List(items) => {
                buf.put_u8(tag::LIST);
                buf.put_u32(items.len() as u32);
                for item in items {
                    item.encode(buf);
                }
            }
            Variant::Map(entries) => {
                buf.put_u8(tag::MAP);
                buf.put_u32(entries.len() as u32);
                for (key, value) in entries {
                    put_string(buf, key);
                    value.encode(buf);
                }
            }
        }
    }

    pub fn decode(buf: &mut &[u8]) -> Result<Variant> {
        need(buf, 1, "variant tag")?;
        Ok(match buf.get_u8() {
            tag::NULL => Variant::Null,
            tag::I32 => {
                need(buf, 4, "i32 variant")?;
                Variant::I32(buf.get_i32())
            }
            tag::I64 => {
                need(buf, 8, "i64 variant")?;
                Variant::I64(buf.get_i64())
            }
            tag::BOOL => {
                need(buf, 1, "bool variant")?;
                match buf.get_u8() {
                    0 => Variant::Bool(false),
                    1 => Variant::Bool(true),
                    other => {
                        return Err(RemodelError::malformed(format!(
                            "bool variant with byte {other}"
                        )))
                    }
                }
            }
            tag::STRING => Variant::String(get_string(buf, "string variant")?),
            tag::BYTES => Variant::Bytes(get_bytes(buf, "bytes variant")?),
            tag::POINT => {
                need(buf, 8, "point variant")?;
                let x = buf.get_i32();
                let y = buf.get_i32();
                Variant::Point { x, y }
            }
            tag::LIST => {
                let count = get_count(buf, "list variant")?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(Variant::decode(buf)?);
                }
                Variant::List(items)
            }
            tag::MAP => {
                let count = get_count(buf, "map variant")?;
                let mut entries = IndexMap::with_capacity(count);
                for _ in 0..count {
                    let key = get_string(buf, "map key")?;
                    let value = Variant::decode(buf)?;
                    entries.insert(key, value);
                }
                Variant::Map(entries)
            }
            other => {
                return Err(RemodelError::malformed(format!(
                    "unknown variant tag {other}"
                )))
            }
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Variant::Null)
    }

    pub fn as_i32(&self) -> Result<i32> {
        match self {
            Variant::I32(value) => Ok(*value),
            other => Err(unexpected("i32", other)),
        }
    }

    /// Like [`Variant::as_i32`], additionally rejecting negative values.
    pub fn as_u32(&self) -> Result<u32> {
        let value = self.as_i32()?;
        u32::try_from(value)
            .map_err(|_| RemodelError::malformed(format!("negative count {value}")))
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Variant::Bool(value) => Ok(*value),
            other => Err(unexpected("bool", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Variant::String(value) => Ok(value),
            other => Err(unexpected("string", other)),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Variant::Bytes(value) => Ok(value),
            other => Err(unexpected("bytes", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[Variant]> {
        match self {
            Variant::List(items) => Ok(items),
            other => Err(unexpected("list", other)),
        }
    }

    pub fn as_map(&self) -> Result<&IndexMap<String, Variant>> {
        match self {
            Variant::Map(entries) => Ok(entries),
            other => Err(unexpected("map", other)),
        }
    }
}

fn unexpected(wanted: &str, got: &Variant) -> RemodelError {
    RemodelError::malformed(format!("expected a {wanted} variant, got {got:?}"))
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::I32(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::I64(value)
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}

impl From<Vec<Variant>> for Variant {
    fn from(items: Vec<Variant>) -> Self {
        Variant::List(items)
    }
}

pub(crate) fn need(buf: &impl Buf, bytes: usize, what: &str) -> Result<()> {
    if buf.remaining() < bytes {
        return Err(RemodelError::malformed(format!(
            "payload ends inside {what}"
        )));
    }
    Ok(())
}

fn get_count(buf: &mut &[u8], what: &str) -> Result<usize> {
    need(buf, 4, what)?;
    let count = buf.get_u32() as usize;
    // every element takes at least one byte, so this bounds allocation too
    if count > buf.remaining() {
        return Err(RemodelError::malformed(format!(
            "{what} claims {count} elements with {} bytes left",
            buf.remaining()
        )));
    }
    Ok(count)
}

pub(crate) fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

pub(crate) fn put_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value);
}

pub(crate) fn get_string(buf: &mut &[u8], what: &str) -> Result<String> {
    let raw = get_bytes(buf, what)?;
    String::from_utf8(raw).map_err(|_| RemodelError::malformed(format!("{what} is not UTF-8")))
}

pub(crate) fn get_bytes(buf: &mut &[u8], what: &str) -> Result<Vec<u8>> {
    need(buf, 4, what)?;
    let length = buf.get_u32() as usize;
    need(buf, length, what)?;
    let mut raw = vec![0u8; length];
    buf.copy_to_slice(&mut raw);
    Ok(raw)
}

/// Fetch a positional argument from a decoded argument list.
pub(crate) fn arg<'a>(args: &'a [Variant], index: usize) -> Result<&'a Variant> {
    args.get(index)
        .ok_or_else(|| RemodelError::malformed(format!("missing argument {index}")))
}
