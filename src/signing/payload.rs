// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Locating the signature inside a device response.
//!
//! Devices wrap their answer differently: a raw `bytes` resource holding the
//! signed blob, a CBOR map with a named hex field, or JSON inside a byte
//! string. Fields are checked in a fixed order and nested maps are searched
//! after the top level.

use serde_json::Value;

use super::SigningError;
use crate::ur::{cbor, CborValue, ReconstructedResource};

/// Field names that may carry the signature or the signed blob, in priority
/// order.
pub const PAYLOAD_FIELDS: &[&str] = &[
    "signedTransaction",
    "signature",
    "txBlob",
    "blob",
    "transaction",
    "hex",
    "data",
];

/// Leading bytes accepted for a bare hex run found in otherwise opaque data.
const FALLBACK_PREFIXES: &[&str] = &["12", "00", "01", "02", "03", "05"];
const FALLBACK_MIN_HEX_LEN: usize = 100;

const MAX_SEARCH_DEPTH: usize = 8;

/// Extract the signature or signed transaction as uppercase hex.
pub fn extract_tx_payload(resource: &ReconstructedResource) -> Result<String, SigningError> {
    if let Ok(value) = cbor::decode(&resource.payload) {
        if let Some(found) = search_cbor(&value, 0) {
            return Ok(found);
        }
    }

    let text = String::from_utf8_lossy(&resource.payload);
    find_hex_run(&text).ok_or(SigningError::NoPayload)
}

fn is_hex(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_hexdigit())
}

fn search_cbor(value: &CborValue, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value.untagged() {
        CborValue::Map(entries) => {
            for field in PAYLOAD_FIELDS {
                let found = match value.untagged().get(field) {
                    Some(CborValue::Text(text)) if is_hex(text) => Some(text.to_uppercase()),
                    Some(CborValue::Bytes(bytes)) => Some(bytes_payload(bytes, depth)),
                    _ => None,
                };
                if found.is_some() {
                    return found;
                }
            }
            entries
                .iter()
                .filter(|(_, v)| matches!(v.untagged(), CborValue::Map(_)))
                .find_map(|(_, v)| search_cbor(v, depth + 1))
        }
        CborValue::Bytes(bytes) => Some(bytes_payload(bytes, depth)),
        CborValue::Text(text) if is_hex(text.trim()) => Some(text.trim().to_uppercase()),
        CborValue::Text(text) => serde_json::from_str::<Value>(text)
            .ok()
            .and_then(|json| search_json(&json, depth + 1)),
        _ => None,
    }
}

/// Byte strings may hold JSON, ASCII hex, or the raw binary itself.
fn bytes_payload(bytes: &[u8], depth: usize) -> String {
    if let Ok(json) = serde_json::from_slice::<Value>(bytes) {
        if let Some(found) = search_json(&json, depth + 1) {
            return found;
        }
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        let text = text.trim();
        if is_hex(text) && text.len() % 2 == 0 {
            return text.to_uppercase();
        }
    }
    hex::encode_upper(bytes)
}

fn search_json(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    let obj = value.as_object()?;
    for field in PAYLOAD_FIELDS {
        if let Some(Value::String(text)) = obj.get(*field) {
            if is_hex(text) {
                return Some(text.to_uppercase());
            }
        }
    }
    obj.values()
        .filter(|v| v.is_object())
        .find_map(|v| search_json(v, depth + 1))
}

/// Last resort: the first run of at least 100 hex characters that starts like
/// a serialized transaction.
fn find_hex_run(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_ascii_hexdigit())
        .filter(|run| run.len() >= FALLBACK_MIN_HEX_LEN)
        .find(|run| FALLBACK_PREFIXES.iter().any(|p| run.starts_with(p)))
        .map(str::to_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(payload: Vec<u8>) -> ReconstructedResource {
        ReconstructedResource {
            ur_type: "bytes".to_string(),
            payload,
        }
    }

    fn text(s: &str) -> CborValue {
        CborValue::Text(s.to_string())
    }

    #[test]
    fn raw_bytes_are_hex_encoded() {
        let blob = vec![0x12, 0x00, 0x14, 0xAB];
        let payload = cbor::encode_bytes(&blob);
        assert_eq!(extract_tx_payload(&resource(payload)).unwrap(), "120014AB");
    }

    #[test]
    fn named_field_in_map() {
        let map = CborValue::Map(vec![
            (text("requestId"), text("abc")),
            (text("signature"), text("3045abcd")),
        ]);
        let payload = cbor::encode(&map);
        assert_eq!(extract_tx_payload(&resource(payload)).unwrap(), "3045ABCD");
    }

    #[test]
    fn field_priority_order() {
        let map = CborValue::Map(vec![
            (text("data"), text("aaaa")),
            (text("txBlob"), text("bbbb")),
        ]);
        let payload = cbor::encode(&map);
        assert_eq!(extract_tx_payload(&resource(payload)).unwrap(), "BBBB");
    }

    #[test]
    fn nested_map_is_searched() {
        let map = CborValue::Map(vec![(
            text("result"),
            CborValue::Map(vec![(text("blob"), CborValue::Bytes(vec![0xDE, 0xAD]))]),
        )]);
        let payload = cbor::encode(&map);
        assert_eq!(extract_tx_payload(&resource(payload)).unwrap(), "DEAD");
    }

    #[test]
    fn json_inside_byte_string() {
        let json = br#"{"signature":"3045cafe","requestId":"1"}"#;
        let payload = cbor::encode_bytes(json);
        assert_eq!(extract_tx_payload(&resource(payload)).unwrap(), "3045CAFE");
    }

    #[test]
    fn non_hex_named_field_is_skipped() {
        let map = CborValue::Map(vec![
            (text("signature"), text("not hex")),
            (text("hex"), text("00ff")),
        ]);
        let payload = cbor::encode(&map);
        assert_eq!(extract_tx_payload(&resource(payload)).unwrap(), "00FF");
    }

    #[test]
    fn falls_back_to_hex_run() {
        let blob = format!("12{}", "0a".repeat(60));
        let payload = format!("garbage:{blob}:trailer").into_bytes();
        assert_eq!(
            extract_tx_payload(&resource(payload)).unwrap(),
            blob.to_uppercase()
        );
    }

    #[test]
    fn nothing_found() {
        let map = CborValue::Map(vec![(text("requestId"), text("abc"))]);
        let payload = cbor::encode(&map);
        assert_eq!(
            extract_tx_payload(&resource(payload)),
            Err(SigningError::NoPayload)
        );
    }
}
