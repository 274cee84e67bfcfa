//! Binary encode/decode for the trace format.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32` length. Each entry is length-delimited so a reader can tell a
//! clean end of stream from a truncated entry.

use std::io::{Read, Write};

use indexmap::IndexMap;

use eventide_core::{PromiseId, TraceEntry, Value, VirtualTime};

use crate::error::ReplayError;
use crate::types::TraceHeader;
use crate::{FORMAT_VERSION, MAGIC};

/// Value type tags.
const TAG_UNDEFINED: u8 = 0;
const TAG_NULL: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_LIST: u8 = 5;
const TAG_OBJECT: u8 = 6;
const TAG_ERROR: u8 = 7;
const TAG_PROMISE: u8 = 8;

/// Deepest list/object nesting the decoder accepts.
pub const MAX_VALUE_DEPTH: usize = 64;

// ── Stream header ──────────────────────────────────────────────

fn read_array<const N: usize>(r: &mut dyn Read) -> Result<[u8; N], ReplayError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn utf8(bytes: Vec<u8>) -> Result<String, ReplayError> {
    String::from_utf8(bytes).map_err(|e| ReplayError::MalformedEntry {
        detail: format!("string is not UTF-8: {e}"),
    })
}

/// Encode the stream header: magic, format version, then the
/// [`TraceHeader`] fields. Written with a single `write_all`.
pub fn encode_header(w: &mut dyn Write, header: &TraceHeader) -> Result<(), ReplayError> {
    let mut buf = Vec::with_capacity(MAGIC.len() + 1 + 4 + header.eventide_version.len() + 8);
    buf.extend_from_slice(&MAGIC);
    buf.push(FORMAT_VERSION);
    put_str(&mut buf, &header.eventide_version);
    buf.extend_from_slice(&header.config_hash.to_le_bytes());
    w.write_all(&buf)?;
    Ok(())
}

/// Decode the stream header, rejecting foreign magic and unknown versions.
pub fn decode_header(r: &mut dyn Read) -> Result<TraceHeader, ReplayError> {
    if read_array::<4>(r)? != MAGIC {
        return Err(ReplayError::InvalidMagic);
    }
    let [version] = read_array::<1>(r)?;
    if version != FORMAT_VERSION {
        return Err(ReplayError::UnsupportedVersion { found: version });
    }
    let name_len = u32::from_le_bytes(read_array(r)?) as usize;
    let mut name = vec![0u8; name_len];
    r.read_exact(&mut name)?;
    Ok(TraceHeader {
        eventide_version: utf8(name)?,
        config_hash: u64::from_le_bytes(read_array(r)?),
    })
}

// ── Value encode/decode ─────────────────────────────────────────

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

/// Append the binary encoding of `value` to `buf`.
///
/// Values nested deeper than [`MAX_VALUE_DEPTH`] are refused, so nothing
/// is written that [`decode_value`] would reject. `buf` is untouched on
/// error.
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), ReplayError> {
    check_depth(value, 0)?;
    put_value(buf, value);
    Ok(())
}

fn check_depth(value: &Value, depth: usize) -> Result<(), ReplayError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(ReplayError::MalformedEntry {
            detail: format!("value nested deeper than {MAX_VALUE_DEPTH}"),
        });
    }
    match value {
        Value::List(items) => items.iter().try_for_each(|v| check_depth(v, depth + 1)),
        Value::Object(map) => map.values().try_for_each(|v| check_depth(v, depth + 1)),
        _ => Ok(()),
    }
}

/// Encoding without the depth check. Hashing uses it so any value has a
/// fingerprint.
pub(crate) fn put_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Undefined => buf.push(TAG_UNDEFINED),
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
        Value::Int(n) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Value::Str(s) => {
            buf.push(TAG_STR);
            put_str(buf, s);
        }
        Value::List(items) => {
            buf.push(TAG_LIST);
            put_u32(buf, items.len() as u32);
            for item in items {
                put_value(buf, item);
            }
        }
        Value::Object(map) => {
            buf.push(TAG_OBJECT);
            put_u32(buf, map.len() as u32);
            for (k, v) in map {
                put_str(buf, k);
                put_value(buf, v);
            }
        }
        Value::Error(msg) => {
            buf.push(TAG_ERROR);
            put_str(buf, msg);
        }
        Value::Promise(id) => {
            buf.push(TAG_PROMISE);
            put_u32(buf, id.0);
        }
    }
}

fn take<'a>(data: &'a [u8], offset: &mut usize, n: usize) -> Result<&'a [u8], ReplayError> {
    let end = offset
        .checked_add(n)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| ReplayError::MalformedEntry {
            detail: format!(
                "need {n} bytes at offset {}, only {} remain",
                *offset,
                data.len().saturating_sub(*offset)
            ),
        })?;
    let slice = &data[*offset..end];
    *offset = end;
    Ok(slice)
}

fn take_u8(data: &[u8], offset: &mut usize) -> Result<u8, ReplayError> {
    Ok(take(data, offset, 1)?[0])
}

fn take_u32(data: &[u8], offset: &mut usize) -> Result<u32, ReplayError> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(take(data, offset, 4)?);
    Ok(u32::from_le_bytes(buf))
}

fn take_u64(data: &[u8], offset: &mut usize) -> Result<u64, ReplayError> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(take(data, offset, 8)?);
    Ok(u64::from_le_bytes(buf))
}

fn take_str(data: &[u8], offset: &mut usize) -> Result<String, ReplayError> {
    let len = take_u32(data, offset)? as usize;
    utf8(take(data, offset, len)?.to_vec())
}

/// Decode one value starting at `offset`, advancing it past the value.
pub fn decode_value(data: &[u8], offset: &mut usize) -> Result<Value, ReplayError> {
    decode_value_at_depth(data, offset, 0)
}

fn decode_value_at_depth(
    data: &[u8],
    offset: &mut usize,
    depth: usize,
) -> Result<Value, ReplayError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(ReplayError::MalformedEntry {
            detail: format!("value nested deeper than {MAX_VALUE_DEPTH}"),
        });
    }
    let tag = take_u8(data, offset)?;
    let value = match tag {
        TAG_UNDEFINED => Value::Undefined,
        TAG_NULL => Value::Null,
        TAG_BOOL => match take_u8(data, offset)? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            b => {
                return Err(ReplayError::MalformedEntry {
                    detail: format!("invalid bool byte: {b}"),
                })
            }
        },
        TAG_INT => Value::Int(take_u64(data, offset)? as i64),
        TAG_STR => Value::Str(take_str(data, offset)?),
        TAG_LIST => {
            let len = take_u32(data, offset)? as usize;
            // Each item needs at least its tag byte.
            let mut items = Vec::with_capacity(len.min(data.len() - *offset));
            for _ in 0..len {
                items.push(decode_value_at_depth(data, offset, depth + 1)?);
            }
            Value::List(items)
        }
        TAG_OBJECT => {
            let len = take_u32(data, offset)? as usize;
            let mut map = IndexMap::with_capacity(len.min(data.len() - *offset));
            for _ in 0..len {
                let key = take_str(data, offset)?;
                let value = decode_value_at_depth(data, offset, depth + 1)?;
                map.insert(key, value);
            }
            Value::Object(map)
        }
        TAG_ERROR => Value::Error(take_str(data, offset)?),
        TAG_PROMISE => Value::Promise(PromiseId(take_u32(data, offset)?)),
        tag => return Err(ReplayError::UnknownValueTag { tag }),
    };
    Ok(value)
}

// ── Entry encode/decode ─────────────────────────────────────────

/// Encode a single trace entry as `[len u32][seq u64][time u64][value]`.
pub fn encode_entry(w: &mut dyn Write, entry: &TraceEntry) -> Result<(), ReplayError> {
    let mut payload = Vec::with_capacity(32);
    payload.extend_from_slice(&entry.seq.to_le_bytes());
    payload.extend_from_slice(&entry.time.as_millis().to_le_bytes());
    encode_value(&mut payload, &entry.value)?;
    w.write_all(&(payload.len() as u32).to_le_bytes())?;
    w.write_all(&payload)?;
    Ok(())
}

/// Read until `buf` is full or the stream ends, returning the byte count.
fn fill(r: &mut dyn Read, buf: &mut [u8]) -> Result<usize, ReplayError> {
    let mut got = 0;
    while got < buf.len() {
        match r.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(got)
}

/// Decode a single trace entry.
///
/// Returns `Ok(None)` on clean EOF (no bytes available), `Ok(Some(entry))`
/// on success, or an error on truncated or corrupt data.
pub fn decode_entry(r: &mut dyn Read) -> Result<Option<TraceEntry>, ReplayError> {
    let mut len_buf = [0u8; 4];
    match fill(r, &mut len_buf)? {
        0 => return Ok(None),
        4 => {}
        got => {
            return Err(ReplayError::MalformedEntry {
                detail: format!("length prefix cut short after {got} of 4 bytes"),
            })
        }
    }
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ReplayError::MalformedEntry {
            detail: format!("truncated entry body: expected {len} bytes"),
        },
        _ => ReplayError::Io(e),
    })?;

    let mut offset = 0;
    let seq = take_u64(&payload, &mut offset)?;
    let time = VirtualTime(take_u64(&payload, &mut offset)?);
    let value = decode_value(&payload, &mut offset)?;
    if offset != payload.len() {
        return Err(ReplayError::MalformedEntry {
            detail: format!(
                "{} trailing bytes after entry {seq}",
                payload.len() - offset
            ),
        });
    }
    Ok(Some(TraceEntry { seq, time, value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip_value(v: &Value) -> Value {
        let mut buf = Vec::new();
        encode_value(&mut buf, v).unwrap();
        let mut offset = 0;
        let out = decode_value(&buf, &mut offset).unwrap();
        assert_eq!(offset, buf.len());
        out
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Undefined),
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-zA-Z0-9 _]{0,16}".prop_map(Value::Str),
            "[a-z]{0,8}".prop_map(Value::Error),
            any::<u32>().prop_map(|n| Value::Promise(PromiseId(n))),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                    .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn value_roundtrip(v in arb_value()) {
            prop_assert_eq!(roundtrip_value(&v), v);
        }
    }

    #[test]
    fn header_roundtrip() {
        let header = TraceHeader {
            eventide_version: "0.1.0".into(),
            config_hash: 0xABCD,
        };
        let mut buf = Vec::new();
        encode_header(&mut buf, &header).unwrap();
        assert_eq!(&buf[..4], b"EVTR");
        assert_eq!(decode_header(&mut buf.as_slice()).unwrap(), header);
    }

    #[test]
    fn bad_magic_rejected() {
        let buf = b"NOPE\x01";
        let err = decode_header(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidMagic));
    }

    #[test]
    fn bad_version_rejected() {
        let mut buf = MAGIC.to_vec();
        buf.push(99);
        let err = decode_header(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ReplayError::UnsupportedVersion { found: 99 }));
    }

    #[test]
    fn entry_roundtrip_and_clean_eof() {
        let entry = TraceEntry {
            seq: 3,
            time: VirtualTime(120),
            value: Value::str("tick"),
        };
        let mut buf = Vec::new();
        encode_entry(&mut buf, &entry).unwrap();
        let mut r = buf.as_slice();
        assert_eq!(decode_entry(&mut r).unwrap(), Some(entry));
        assert_eq!(decode_entry(&mut r).unwrap(), None);
    }

    #[test]
    fn truncated_length_prefix_is_malformed() {
        let buf = [7u8, 0];
        let err = decode_entry(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ReplayError::MalformedEntry { .. }));
    }

    #[test]
    fn truncated_body_is_malformed() {
        let entry = TraceEntry {
            seq: 0,
            time: VirtualTime(0),
            value: Value::str("cut short"),
        };
        let mut buf = Vec::new();
        encode_entry(&mut buf, &entry).unwrap();
        buf.truncate(buf.len() - 3);
        let err = decode_entry(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ReplayError::MalformedEntry { .. }));
    }

    #[test]
    fn unknown_tag_reported() {
        let mut offset = 0;
        let err = decode_value(&[200], &mut offset).unwrap_err();
        assert!(matches!(err, ReplayError::UnknownValueTag { tag: 200 }));
    }

    fn nested_list(levels: usize) -> Value {
        (0..levels).fold(Value::Int(1), |v, _| Value::List(vec![v]))
    }

    #[test]
    fn deepest_accepted_nesting_roundtrips() {
        let v = nested_list(MAX_VALUE_DEPTH);
        assert_eq!(roundtrip_value(&v), v);
    }

    #[test]
    fn encoder_refuses_what_decoder_would_reject() {
        let v = nested_list(MAX_VALUE_DEPTH + 1);
        let mut buf = Vec::new();
        let err = encode_value(&mut buf, &v).unwrap_err();
        assert!(matches!(err, ReplayError::MalformedEntry { .. }));
        assert!(buf.is_empty());

        let mut object = IndexMap::new();
        object.insert("deep".to_string(), nested_list(MAX_VALUE_DEPTH));
        assert!(encode_value(&mut buf, &Value::Object(object)).is_err());
    }

    #[test]
    fn excessive_nesting_rejected_on_decode() {
        let mut buf = Vec::new();
        put_value(&mut buf, &nested_list(MAX_VALUE_DEPTH + 1));
        let mut offset = 0;
        let err = decode_value(&buf, &mut offset).unwrap_err();
        assert!(matches!(err, ReplayError::MalformedEntry { .. }));
    }

    #[test]
    fn too_deep_entry_is_not_written() {
        let entry = TraceEntry {
            seq: 0,
            time: VirtualTime(0),
            value: nested_list(MAX_VALUE_DEPTH + 6),
        };
        let mut out = Vec::new();
        assert!(encode_entry(&mut out, &entry).is_err());
        assert!(out.is_empty());
    }
}
