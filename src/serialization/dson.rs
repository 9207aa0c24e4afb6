use crate::serialization::{to_value, Encoding, Serializable, Value};

// One marker byte per value kind. Integers are big-endian, strings and byte
// runs are u32-length-prefixed, collections are count-prefixed.
const MARK_BOOL: u8 = 0x01;
const MARK_U64: u8 = 0x02;
const MARK_U256: u8 = 0x03;
const MARK_STR: u8 = 0x04;
const MARK_BYTES: u8 = 0x05;
const MARK_EUID: u8 = 0x06;
const MARK_ADDRESS: u8 = 0x07;
const MARK_LIST: u8 = 0x08;
const MARK_SET: u8 = 0x09;
const MARK_MAP: u8 = 0x0a;
const MARK_OBJECT: u8 = 0x0b;

/// Encode a serializable type to its canonical DSON bytes
///
/// A pure function of the DSON-included fields; there is deliberately no
/// decoder, the canonical form exists only for hashing and signing.
pub fn to_dson_bytes<T: Serializable>(obj: &T) -> Vec<u8> {
    encode(&to_value(obj, Encoding::Dson))
}

/// Encode an already-built value tree to canonical bytes
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u32).to_be_bytes());
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    write_len(out, s.len());
    out.extend_from_slice(s.as_bytes());
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Bool(b) => {
            out.push(MARK_BOOL);
            out.push(*b as u8);
        }
        Value::U64(n) => {
            out.push(MARK_U64);
            out.extend_from_slice(&n.to_be_bytes());
        }
        Value::U256(amount) => {
            out.push(MARK_U256);
            out.extend_from_slice(amount.to_be_bytes());
        }
        Value::Str(s) => {
            out.push(MARK_STR);
            write_str(out, s);
        }
        Value::Bytes(bytes) => {
            out.push(MARK_BYTES);
            write_len(out, bytes.len());
            out.extend_from_slice(bytes);
        }
        Value::Euid(euid) => {
            out.push(MARK_EUID);
            out.extend_from_slice(euid.as_bytes());
        }
        Value::Address(address) => {
            out.push(MARK_ADDRESS);
            write_str(out, &address.to_string());
        }
        Value::List(items) => {
            out.push(MARK_LIST);
            write_len(out, items.len());
            for item in items {
                write_value(out, item);
            }
        }
        Value::Set(items) => {
            // Canonical order: lexicographic over the encoded entries, so
            // insertion order never leaks into the hash
            out.push(MARK_SET);
            write_len(out, items.len());
            let mut encoded: Vec<Vec<u8>> = items.iter().map(encode).collect();
            encoded.sort();
            for item in encoded {
                out.extend_from_slice(&item);
            }
        }
        Value::Map(entries) => {
            out.push(MARK_MAP);
            write_len(out, entries.len());
            let mut sorted: Vec<&(String, Value)> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, entry) in sorted {
                write_str(out, key);
                write_value(out, entry);
            }
        }
        Value::Object { tag, fields } => {
            out.push(MARK_OBJECT);
            write_str(out, tag);
            write_len(out, fields.len());
            for (name, field) in fields {
                write_str(out, name);
                write_value(out, field);
            }
        }
    }
}
