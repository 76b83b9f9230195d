//! Binary wire codec for chunk snapshots (spec §4.D).
//!
//! Primitives: unsigned varint (LEB128-style), run-length encoding over
//! bytes, and little-endian `f64` packing. Dense chunks are framed with
//! magic `0x44`, sparse chunks with magic `0x53`; both carry a version byte
//! of `0x01`.

use crate::chunk::tags::{TAG_BOOLEAN, TAG_EMPTY, TAG_NUMBER, TAG_STRING};
use crate::chunk::{ChunkSnapshot, SnapshotValue, CHUNK_AREA};
use crate::error::DecodeError;

const MAGIC_DENSE: u8 = 0x44;
const MAGIC_SPARSE: u8 = 0x53;
const FORMAT_VERSION: u8 = 0x01;

/// Maximum run length a single RLE pair can encode; longer runs are split
/// into multiple pairs.
const RLE_MAX_RUN: u32 = 255;

pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

pub fn decode_varint(bytes: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*pos).ok_or(DecodeError::Truncated)?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

/// Run-length encodes `bytes` as a sequence of `(count, value)` pairs, each
/// run capped at [`RLE_MAX_RUN`].
pub fn rle_encode(bytes: &[u8]) -> Vec<(u8, u8)> {
    let mut pairs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let value = bytes[i];
        let mut run = 0u32;
        while i < bytes.len() && bytes[i] == value && run < RLE_MAX_RUN {
            run += 1;
            i += 1;
        }
        pairs.push((run as u8, value));
    }
    pairs
}

pub fn rle_decode(pairs: &[(u8, u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(count, value) in pairs {
        out.extend(std::iter::repeat(value).take(count as usize));
    }
    out
}

fn encode_f64(value: f64, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn decode_f64(bytes: &[u8], pos: &mut usize) -> Result<f64, DecodeError> {
    let slice = bytes.get(*pos..*pos + 8).ok_or(DecodeError::Truncated)?;
    *pos += 8;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice);
    Ok(f64::from_le_bytes(buf))
}

/// Encodes a chunk snapshot to its wire representation.
pub fn encode_snapshot(snapshot: &ChunkSnapshot) -> Vec<u8> {
    match snapshot {
        ChunkSnapshot::Dense { tag, number, string_id } => {
            encode_dense(tag, number, string_id)
        }
        ChunkSnapshot::Sparse { entries } => encode_sparse(entries),
    }
}

fn encode_dense(tag: &[u8], number: &[f64], string_id: &[u32]) -> Vec<u8> {
    let mut out = vec![MAGIC_DENSE, FORMAT_VERSION];
    let pairs = rle_encode(tag);
    encode_varint(pairs.len() as u64, &mut out);
    for (count, value) in pairs {
        out.push(count);
        out.push(value);
    }

    let numeric_count = tag.iter().filter(|&&t| t == TAG_NUMBER || t == TAG_BOOLEAN).count();
    encode_varint(numeric_count as u64, &mut out);
    for i in 0..tag.len() {
        if tag[i] == TAG_NUMBER || tag[i] == TAG_BOOLEAN {
            encode_f64(number[i], &mut out);
        }
    }

    let string_count = tag.iter().filter(|&&t| t == TAG_STRING).count();
    encode_varint(string_count as u64, &mut out);
    for i in 0..tag.len() {
        if tag[i] == TAG_STRING {
            encode_varint(string_id[i] as u64, &mut out);
        }
    }
    out
}

fn encode_sparse(entries: &[(u16, SnapshotValue)]) -> Vec<u8> {
    let mut out = vec![MAGIC_SPARSE, FORMAT_VERSION];
    encode_varint(entries.len() as u64, &mut out);
    for (local, value) in entries {
        encode_varint(*local as u64, &mut out);
        match value {
            SnapshotValue::Number(n) => {
                out.push(TAG_NUMBER);
                encode_f64(*n, &mut out);
            }
            SnapshotValue::Boolean(b) => {
                out.push(TAG_BOOLEAN);
                out.push(if *b { 1 } else { 0 });
            }
            SnapshotValue::StringId(id) => {
                out.push(TAG_STRING);
                encode_varint(*id as u64, &mut out);
            }
        }
    }
    out
}

/// Decodes a wire-format chunk back into a snapshot.
pub fn decode_snapshot(bytes: &[u8]) -> Result<ChunkSnapshot, DecodeError> {
    let magic = *bytes.first().ok_or(DecodeError::Truncated)?;
    let version = *bytes.get(1).ok_or(DecodeError::Truncated)?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnknownVersion(version));
    }
    let mut pos = 2;
    match magic {
        MAGIC_DENSE => decode_dense(bytes, &mut pos),
        MAGIC_SPARSE => decode_sparse(bytes, &mut pos),
        other => Err(DecodeError::BadMagic(other)),
    }
}

fn decode_dense(bytes: &[u8], pos: &mut usize) -> Result<ChunkSnapshot, DecodeError> {
    let pair_count = decode_varint(bytes, pos)? as usize;
    let mut tag = Vec::with_capacity(CHUNK_AREA);
    for _ in 0..pair_count {
        let count = *bytes.get(*pos).ok_or(DecodeError::Truncated)?;
        let value = *bytes.get(*pos + 1).ok_or(DecodeError::Truncated)?;
        *pos += 2;
        tag.extend(std::iter::repeat(value).take(count as usize));
    }

    let numeric_count = decode_varint(bytes, pos)? as usize;
    let mut numeric_values = Vec::with_capacity(numeric_count);
    for _ in 0..numeric_count {
        numeric_values.push(decode_f64(bytes, pos)?);
    }

    let string_count = decode_varint(bytes, pos)? as usize;
    let mut string_values = Vec::with_capacity(string_count);
    for _ in 0..string_count {
        string_values.push(decode_varint(bytes, pos)? as u32);
    }

    let mut number = vec![0.0; tag.len()];
    let mut string_id = vec![0u32; tag.len()];
    let mut numeric_iter = numeric_values.into_iter();
    let mut string_iter = string_values.into_iter();
    for i in 0..tag.len() {
        match tag[i] {
            TAG_NUMBER | TAG_BOOLEAN => {
                number[i] = numeric_iter.next().ok_or(DecodeError::Truncated)?;
            }
            TAG_STRING => {
                string_id[i] = string_iter.next().ok_or(DecodeError::Truncated)?;
            }
            TAG_EMPTY => {}
            other => return Err(DecodeError::UnknownTag(other)),
        }
    }
    Ok(ChunkSnapshot::Dense { tag, number, string_id })
}

fn decode_sparse(bytes: &[u8], pos: &mut usize) -> Result<ChunkSnapshot, DecodeError> {
    let count = decode_varint(bytes, pos)?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let local = decode_varint(bytes, pos)? as u16;
        let tag = *bytes.get(*pos).ok_or(DecodeError::Truncated)?;
        *pos += 1;
        let value = match tag {
            TAG_NUMBER => SnapshotValue::Number(decode_f64(bytes, pos)?),
            TAG_BOOLEAN => {
                let b = *bytes.get(*pos).ok_or(DecodeError::Truncated)?;
                *pos += 1;
                SnapshotValue::Boolean(b != 0)
            }
            TAG_STRING => SnapshotValue::StringId(decode_varint(bytes, pos)? as u32),
            other => return Err(DecodeError::UnknownTag(other)),
        };
        entries.push((local, value));
    }
    Ok(ChunkSnapshot::Sparse { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundary_127_128() {
        let mut out = Vec::new();
        encode_varint(127, &mut out);
        assert_eq!(out, vec![127]);

        let mut out = Vec::new();
        encode_varint(128, &mut out);
        assert_eq!(out, vec![0x80, 0x01]);

        let mut pos = 0;
        assert_eq!(decode_varint(&out, &mut pos).unwrap(), 128);
        assert_eq!(pos, 2);
    }

    #[test]
    fn rle_splits_runs_over_255() {
        let bytes = vec![7u8; 300];
        let pairs = rle_encode(&bytes);
        assert_eq!(pairs, vec![(255, 7), (45, 7)]);
        assert_eq!(rle_decode(&pairs), bytes);
    }

    #[test]
    fn dense_round_trip() {
        let mut tag = vec![TAG_EMPTY; CHUNK_AREA];
        let mut number = vec![0.0; CHUNK_AREA];
        let mut string_id = vec![0u32; CHUNK_AREA];
        tag[0] = TAG_NUMBER;
        number[0] = 3.5;
        tag[10] = TAG_STRING;
        string_id[10] = 9;
        tag[11] = TAG_BOOLEAN;
        number[11] = 1.0;

        let snapshot = ChunkSnapshot::Dense { tag, number, string_id };
        let encoded = encode_snapshot(&snapshot);
        assert_eq!(encoded[0], MAGIC_DENSE);
        assert_eq!(encoded[1], FORMAT_VERSION);
        let decoded = decode_snapshot(&encoded).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn sparse_round_trip() {
        let entries = vec![
            (3u16, SnapshotValue::Number(1.0)),
            (500u16, SnapshotValue::StringId(7)),
            (4095u16, SnapshotValue::Boolean(true)),
        ];
        let snapshot = ChunkSnapshot::Sparse { entries };
        let encoded = encode_snapshot(&snapshot);
        assert_eq!(encoded[0], MAGIC_SPARSE);
        let decoded = decode_snapshot(&encoded).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = vec![0xffu8, FORMAT_VERSION, 0];
        assert_eq!(decode_snapshot(&bytes), Err(DecodeError::BadMagic(0xff)));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = vec![MAGIC_SPARSE, FORMAT_VERSION];
        assert_eq!(decode_snapshot(&bytes), Err(DecodeError::Truncated));
    }

    proptest::proptest! {
        #[test]
        fn varint_round_trips(value: u64) {
            let mut out = Vec::new();
            encode_varint(value, &mut out);
            let mut pos = 0;
            proptest::prop_assert_eq!(decode_varint(&out, &mut pos).unwrap(), value);
            proptest::prop_assert_eq!(pos, out.len());
        }

        #[test]
        fn rle_round_trips(bytes: Vec<u8>) {
            let pairs = rle_encode(&bytes);
            proptest::prop_assert_eq!(rle_decode(&pairs), bytes);
        }
    }
}
