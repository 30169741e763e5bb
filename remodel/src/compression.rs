use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::{RemodelError, Result};

/// Compress an encoded payload for the wire. The result carries the
/// uncompressed length as a big-endian u32 prefix ahead of the deflate
/// stream, so the receiver can bound its allocation before inflating.
pub fn compress_payload(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len() / 2 + 16);
    out.extend_from_slice(&(raw.len() as u32).to_be_bytes());
    let mut encoder = ZlibEncoder::new(out, Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

pub fn decompress_payload(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    if data.len() < 4 {
        return Err(RemodelError::malformed(
            "compressed payload shorter than its length prefix",
        ));
    }
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&data[..4]);
    let expected = u32::from_be_bytes(prefix) as usize;
    if expected > limit {
        return Err(RemodelError::Oversize {
            length: expected,
            limit,
        });
    }
    let mut raw = Vec::with_capacity(expected);
    let mut decoder = ZlibDecoder::new(&data[4..]).take(expected as u64 + 1);
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| RemodelError::malformed(format!("corrupt deflate stream: {e}")))?;
    if raw.len() != expected {
        return Err(RemodelError::malformed(format!(
            "inflated to {} bytes, length prefix said {expected}",
            raw.len()
        )));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let raw: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress_payload(&raw).unwrap();
        assert!(compressed.len() < raw.len());
        assert_eq!(decompress_payload(&compressed, 1 << 20).unwrap(), raw);
    }

    #[test]
    fn empty_roundtrip() {
        let compressed = compress_payload(&[]).unwrap();
        assert_eq!(decompress_payload(&compressed, 1 << 20).unwrap(), vec![]);
    }

    #[test]
    fn short_prefix_is_rejected() {
        assert!(matches!(
            decompress_payload(&[], 1 << 20),
            Err(RemodelError::Malformed(_))
        ));
        assert!(matches!(
            decompress_payload(&[0, 0, 1], 1 << 20),
            Err(RemodelError::Malformed(_))
        ));
    }

    #[test]
    fn advertised_size_is_capped() {
        let compressed = compress_payload(&[7u8; 64]).unwrap();
        assert!(matches!(
            decompress_payload(&compressed, 16),
            Err(RemodelError::Oversize { length: 64, limit: 16 })
        ));
    }

    #[test]
    fn lying_prefix_is_rejected() {
        let mut compressed = compress_payload(&[7u8; 64]).unwrap();
        compressed[..4].copy_from_slice(&32u32.to_be_bytes());
        assert!(matches!(
            decompress_payload(&compressed, 1 << 20),
            Err(RemodelError::Malformed(_))
        ));
    }

    #[test]
    fn corrupt_stream_is_rejected() {
        let mut compressed = compress_payload(b"a payload that deflates").unwrap();
        let end = compressed.len() - 1;
        compressed[6..end].fill(0xAA);
        assert!(matches!(
            decompress_payload(&compressed, 1 << 20),
            Err(RemodelError::Malformed(_))
        ));
    }
}
