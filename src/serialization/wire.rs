use crate::identity::Address;
use crate::record::{Euid, TokenAmount};
use crate::serialization::{to_value, CodecError, Encoding, Serializable, Value};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use serde_json::Value as Json;

/// Field carrying the embedded type tag in every wire object
pub const SERIALIZER_FIELD: &str = "serializer";

/// Encode a serializable type to its self-describing wire form
pub fn to_wire<T: Serializable>(obj: &T) -> Json {
    to_wire_value(&to_value(obj, Encoding::Wire))
}

/// Lower a value tree into JSON
pub fn to_wire_value(value: &Value) -> Json {
    match value {
        Value::Bool(b) => json!(b),
        Value::U64(n) => json!(n),
        Value::U256(amount) => json!(amount.to_hex()),
        Value::Str(s) => json!(s),
        Value::Bytes(bytes) => json!(BASE64.encode(bytes)),
        Value::Euid(euid) => json!(euid.to_hex()),
        Value::Address(address) => json!(address.to_string()),
        Value::List(items) | Value::Set(items) => {
            Json::Array(items.iter().map(to_wire_value).collect())
        }
        Value::Map(entries) => {
            let mut map = serde_json::Map::new();
            for (key, entry) in entries {
                map.insert(key.clone(), to_wire_value(entry));
            }
            Json::Object(map)
        }
        Value::Object { tag, fields } => {
            let mut map = serde_json::Map::new();
            map.insert(SERIALIZER_FIELD.to_string(), json!(tag));
            for (name, field) in fields {
                map.insert((*name).to_string(), to_wire_value(field));
            }
            Json::Object(map)
        }
    }
}

// ============================================================================
// DECODE HELPERS
// ============================================================================
//
// `from_wire` constructors are written per type against these helpers; each
// knows the shape it expects, so scalar JSON values need no self-description.

pub type JsonMap = serde_json::Map<String, Json>;

/// Read the embedded type tag of a wire object
pub fn embedded_tag(map: &JsonMap) -> Result<&str, CodecError> {
    map.get(SERIALIZER_FIELD)
        .and_then(Json::as_str)
        .ok_or_else(|| CodecError::mismatch("?", "missing serializer tag"))
}

/// Check that a wire value is an object of the expected type
///
/// A missing tag is accepted (the expected type stands in for it); a present
/// tag must match.
pub fn expect_object<'a>(value: &'a Json, tag: &str) -> Result<&'a JsonMap, CodecError> {
    let map = value
        .as_object()
        .ok_or_else(|| CodecError::mismatch(tag, "expected a JSON object"))?;
    if let Some(found) = map.get(SERIALIZER_FIELD) {
        let found = found
            .as_str()
            .ok_or_else(|| CodecError::mismatch(tag, "serializer tag must be a string"))?;
        if found != tag {
            return Err(CodecError::mismatch(
                tag,
                format!("embedded tag is '{found}'"),
            ));
        }
    }
    Ok(map)
}

fn required<'a>(map: &'a JsonMap, tag: &str, name: &str) -> Result<&'a Json, CodecError> {
    map.get(name)
        .ok_or_else(|| CodecError::mismatch(tag, format!("missing field '{name}'")))
}

/// Read a required field as raw JSON, for nested typed decoding
pub fn get_value<'a>(map: &'a JsonMap, tag: &str, name: &str) -> Result<&'a Json, CodecError> {
    required(map, tag, name)
}

pub fn get_str<'a>(map: &'a JsonMap, tag: &str, name: &str) -> Result<&'a str, CodecError> {
    required(map, tag, name)?
        .as_str()
        .ok_or_else(|| CodecError::mismatch(tag, format!("field '{name}' must be a string")))
}

pub fn get_u64(map: &JsonMap, tag: &str, name: &str) -> Result<u64, CodecError> {
    required(map, tag, name)?
        .as_u64()
        .ok_or_else(|| CodecError::mismatch(tag, format!("field '{name}' must be an unsigned integer")))
}

pub fn get_bool(map: &JsonMap, tag: &str, name: &str) -> Result<bool, CodecError> {
    required(map, tag, name)?
        .as_bool()
        .ok_or_else(|| CodecError::mismatch(tag, format!("field '{name}' must be a boolean")))
}

pub fn get_u256(map: &JsonMap, tag: &str, name: &str) -> Result<TokenAmount, CodecError> {
    let hex = get_str(map, tag, name)?;
    TokenAmount::from_hex(hex)
        .map_err(|e| CodecError::mismatch(tag, format!("field '{name}': {e}")))
}

pub fn get_euid(map: &JsonMap, tag: &str, name: &str) -> Result<Euid, CodecError> {
    let hex = get_str(map, tag, name)?;
    Euid::from_hex(hex).map_err(|e| CodecError::mismatch(tag, format!("field '{name}': {e}")))
}

pub fn get_address(map: &JsonMap, tag: &str, name: &str) -> Result<Address, CodecError> {
    let text = get_str(map, tag, name)?;
    Address::parse(text).map_err(|e| CodecError::mismatch(tag, format!("field '{name}': {e}")))
}

pub fn get_bytes(map: &JsonMap, tag: &str, name: &str) -> Result<Vec<u8>, CodecError> {
    let encoded = get_str(map, tag, name)?;
    BASE64
        .decode(encoded)
        .map_err(|e| CodecError::mismatch(tag, format!("field '{name}': invalid base64: {e}")))
}

pub fn get_array<'a>(map: &'a JsonMap, tag: &str, name: &str) -> Result<&'a Vec<Json>, CodecError> {
    required(map, tag, name)?
        .as_array()
        .ok_or_else(|| CodecError::mismatch(tag, format!("field '{name}' must be an array")))
}

pub fn get_object<'a>(map: &'a JsonMap, tag: &str, name: &str) -> Result<&'a JsonMap, CodecError> {
    required(map, tag, name)?
        .as_object()
        .ok_or_else(|| CodecError::mismatch(tag, format!("field '{name}' must be an object")))
}

/// Optional object field: absent is fine, present-but-wrong-shape is not
pub fn opt_object<'a>(
    map: &'a JsonMap,
    tag: &str,
    name: &str,
) -> Result<Option<&'a JsonMap>, CodecError> {
    match map.get(name) {
        None => Ok(None),
        Some(v) => v
            .as_object()
            .map(Some)
            .ok_or_else(|| CodecError::mismatch(tag, format!("field '{name}' must be an object"))),
    }
}
