// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! XRPL canonical binary codec.
//!
//! Transactions are serialized as a sequence of `(field header, value)`
//! pairs sorted by `(type code, field code)`. Nested objects end with
//! `0xE1`, arrays with `0xF1`. Variable-length fields (blobs, account IDs)
//! carry a 1 to 3 byte length prefix.

use serde_json::{Map, Value};
use sha2::{Digest, Sha512};
use thiserror::Error;

use super::address::{decode_account_id, encode_account_id};
use super::amount::{decode_amount, encode_amount};
use super::definitions::{
    field_by_code, field_by_name, transaction_type_code, transaction_type_name, FieldDef,
    FieldType, ARRAY_END_MARKER, OBJECT_END_MARKER,
};

/// `TXN\0`, the prefix hashed in front of a signed transaction.
const TRANSACTION_ID_PREFIX: [u8; 4] = [0x54, 0x58, 0x4E, 0x00];

const MAX_SINGLE_BYTE_LENGTH: usize = 192;
const MAX_DOUBLE_BYTE_LENGTH: usize = 12_480;
const MAX_TRIPLE_BYTE_LENGTH: usize = 918_744;

/// Deepest STObject/STArray nesting accepted when decoding.
const MAX_NESTING_DEPTH: usize = 8;

/// Keys the ledger attaches to transaction JSON that are not serialized.
const NON_SERIALIZED_KEYS: &[&str] = &["hash"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown transaction type: {0}")]
    UnknownTransactionType(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("unexpected end of binary data")]
    UnexpectedEnd,

    #[error("unknown field code (type {type_code}, nth {nth})")]
    UnknownFieldCode { type_code: u8, nth: u8 },

    #[error("expected a JSON object")]
    NotAnObject,
}

// =============================================================================
// Reader
// =============================================================================

/// Cursor over serialized bytes.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEnd)?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Read a variable-length prefix.
    pub fn read_vl_length(&mut self) -> Result<usize, CodecError> {
        let b1 = self.read_u8()? as usize;
        match b1 {
            0..=192 => Ok(b1),
            193..=240 => {
                let b2 = self.read_u8()? as usize;
                Ok(193 + (b1 - 193) * 256 + b2)
            }
            241..=254 => {
                let b2 = self.read_u8()? as usize;
                let b3 = self.read_u8()? as usize;
                Ok(12_481 + (b1 - 241) * 65_536 + b2 * 256 + b3)
            }
            _ => Err(CodecError::InvalidValue {
                field: "length prefix".to_string(),
                reason: format!("invalid first byte {b1:#04x}"),
            }),
        }
    }

    /// Read a field header and resolve it against the field table.
    fn read_field(&mut self) -> Result<&'static FieldDef, CodecError> {
        let first = self.read_u8()?;
        let mut type_code = first >> 4;
        let mut nth = first & 0x0F;
        if type_code == 0 {
            type_code = self.read_u8()?;
        }
        if nth == 0 {
            nth = self.read_u8()?;
        }
        field_by_code(type_code, nth).ok_or(CodecError::UnknownFieldCode { type_code, nth })
    }
}

/// Encode a variable-length prefix.
pub fn encode_vl_length(len: usize) -> Result<Vec<u8>, CodecError> {
    if len <= MAX_SINGLE_BYTE_LENGTH {
        return Ok(vec![len as u8]);
    }
    if len <= MAX_DOUBLE_BYTE_LENGTH {
        let len = len - 193;
        return Ok(vec![193 + (len >> 8) as u8, (len & 0xFF) as u8]);
    }
    if len <= MAX_TRIPLE_BYTE_LENGTH {
        let len = len - 12_481;
        return Ok(vec![
            241 + (len >> 16) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]);
    }
    Err(CodecError::InvalidValue {
        field: "length prefix".to_string(),
        reason: format!("{len} bytes exceeds the maximum variable length"),
    })
}

// =============================================================================
// Encoding
// =============================================================================

/// Serialize a transaction JSON object into canonical binary form.
pub fn encode_transaction(tx: &Value) -> Result<Vec<u8>, CodecError> {
    let obj = tx.as_object().ok_or(CodecError::NotAnObject)?;
    let mut out = Vec::new();
    write_object_fields(&mut out, obj)?;
    Ok(out)
}

/// Serialize a transaction JSON object into an uppercase hex blob.
pub fn encode_transaction_hex(tx: &Value) -> Result<String, CodecError> {
    encode_transaction(tx).map(hex::encode_upper)
}

fn write_object_fields(out: &mut Vec<u8>, obj: &Map<String, Value>) -> Result<(), CodecError> {
    let mut fields = obj
        .iter()
        .filter(|(key, _)| !NON_SERIALIZED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| {
            field_by_name(key)
                .map(|def| (def, value))
                .ok_or_else(|| CodecError::UnknownField(key.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    fields.sort_by_key(|(def, _)| def.sort_key());

    for (def, value) in fields {
        out.extend_from_slice(&def.header());
        write_field_value(out, def, value)?;
    }
    Ok(())
}

fn write_field_value(out: &mut Vec<u8>, def: &FieldDef, value: &Value) -> Result<(), CodecError> {
    let invalid = |reason: &str| CodecError::InvalidValue {
        field: def.name.to_string(),
        reason: reason.to_string(),
    };

    match def.field_type {
        FieldType::UInt8 => {
            let v = u8::try_from(json_uint(def, value)?).map_err(|_| invalid("exceeds u8"))?;
            out.push(v);
        }
        FieldType::UInt16 => {
            let v = if def.name == "TransactionType" {
                match value {
                    Value::String(name) => transaction_type_code(name)
                        .ok_or_else(|| CodecError::UnknownTransactionType(name.clone()))?,
                    _ => u16::try_from(json_uint(def, value)?)
                        .map_err(|_| invalid("exceeds u16"))?,
                }
            } else {
                u16::try_from(json_uint(def, value)?).map_err(|_| invalid("exceeds u16"))?
            };
            out.extend_from_slice(&v.to_be_bytes());
        }
        FieldType::UInt32 => {
            let v = u32::try_from(json_uint(def, value)?).map_err(|_| invalid("exceeds u32"))?;
            out.extend_from_slice(&v.to_be_bytes());
        }
        FieldType::Hash128 => write_hash(out, def, value, 16)?,
        FieldType::Hash256 => write_hash(out, def, value, 32)?,
        FieldType::Amount => out.extend_from_slice(&encode_amount(value)?),
        FieldType::Blob => {
            let bytes = decode_hex_field(def, value)?;
            out.extend_from_slice(&encode_vl_length(bytes.len())?);
            out.extend_from_slice(&bytes);
        }
        FieldType::AccountId => {
            let address = value.as_str().ok_or_else(|| invalid("expected an address"))?;
            let id = decode_account_id(address)?;
            out.extend_from_slice(&encode_vl_length(id.len())?);
            out.extend_from_slice(&id);
        }
        FieldType::StObject => {
            let inner = value.as_object().ok_or_else(|| invalid("expected an object"))?;
            write_object_fields(out, inner)?;
            out.push(OBJECT_END_MARKER);
        }
        FieldType::StArray => {
            let items = value.as_array().ok_or_else(|| invalid("expected an array"))?;
            for item in items {
                // Each element is a single-key wrapper like {"Memo": {...}}.
                let wrapper = item
                    .as_object()
                    .filter(|o| o.len() == 1)
                    .ok_or_else(|| invalid("array elements must be single-field objects"))?;
                write_object_fields(out, wrapper)?;
            }
            out.push(ARRAY_END_MARKER);
        }
    }
    Ok(())
}

fn json_uint(def: &FieldDef, value: &Value) -> Result<u64, CodecError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| CodecError::InvalidValue {
        field: def.name.to_string(),
        reason: format!("expected an unsigned integer, got {value}"),
    })
}

fn decode_hex_field(def: &FieldDef, value: &Value) -> Result<Vec<u8>, CodecError> {
    let text = value.as_str().ok_or_else(|| CodecError::InvalidValue {
        field: def.name.to_string(),
        reason: "expected a hex string".to_string(),
    })?;
    hex::decode(text).map_err(|e| CodecError::InvalidHex(format!("{}: {e}", def.name)))
}

fn write_hash(
    out: &mut Vec<u8>,
    def: &FieldDef,
    value: &Value,
    width: usize,
) -> Result<(), CodecError> {
    let bytes = decode_hex_field(def, value)?;
    if bytes.len() != width {
        return Err(CodecError::InvalidValue {
            field: def.name.to_string(),
            reason: format!("expected {width} bytes, got {}", bytes.len()),
        });
    }
    out.extend_from_slice(&bytes);
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a serialized transaction into its JSON form.
pub fn decode_transaction(blob: &[u8]) -> Result<Value, CodecError> {
    let mut reader = BinaryReader::new(blob);
    let fields = read_object_fields(&mut reader, 0)?;
    Ok(Value::Object(fields))
}

/// Decode a hex transaction blob (either case) into its JSON form.
pub fn decode_transaction_hex(blob: &str) -> Result<Value, CodecError> {
    let bytes = hex::decode(blob.trim()).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
    decode_transaction(&bytes)
}

/// `depth` is 0 for the transaction itself and grows by one per inner object.
fn read_object_fields(
    reader: &mut BinaryReader<'_>,
    depth: usize,
) -> Result<Map<String, Value>, CodecError> {
    let nested = depth > 0;
    let mut fields = Map::new();
    loop {
        if reader.is_empty() {
            if nested {
                return Err(CodecError::UnexpectedEnd);
            }
            return Ok(fields);
        }
        if nested && reader.peek() == Some(OBJECT_END_MARKER) {
            reader.read_u8()?;
            return Ok(fields);
        }
        let def = reader.read_field()?;
        let value = read_field_value(reader, def, depth)?;
        fields.insert(def.name.to_string(), value);
    }
}

fn read_field_value(
    reader: &mut BinaryReader<'_>,
    def: &FieldDef,
    depth: usize,
) -> Result<Value, CodecError> {
    let nests = matches!(def.field_type, FieldType::StObject | FieldType::StArray);
    if nests && depth >= MAX_NESTING_DEPTH {
        return Err(CodecError::InvalidValue {
            field: def.name.to_string(),
            reason: format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
        });
    }
    let value = match def.field_type {
        FieldType::UInt8 => Value::from(reader.read_u8()?),
        FieldType::UInt16 => {
            let code = reader.read_u16()?;
            if def.name == "TransactionType" {
                let name = transaction_type_name(code)
                    .ok_or_else(|| CodecError::UnknownTransactionType(code.to_string()))?;
                Value::String(name.to_string())
            } else {
                Value::from(code)
            }
        }
        FieldType::UInt32 => Value::from(reader.read_u32()?),
        FieldType::Hash128 => Value::String(hex::encode_upper(reader.read_bytes(16)?)),
        FieldType::Hash256 => Value::String(hex::encode_upper(reader.read_bytes(32)?)),
        FieldType::Amount => decode_amount(reader)?,
        FieldType::Blob => {
            let len = reader.read_vl_length()?;
            Value::String(hex::encode_upper(reader.read_bytes(len)?))
        }
        FieldType::AccountId => {
            let len = reader.read_vl_length()?;
            if len != 20 {
                return Err(CodecError::InvalidValue {
                    field: def.name.to_string(),
                    reason: format!("account ID must be 20 bytes, got {len}"),
                });
            }
            Value::String(encode_account_id(&reader.read_array::<20>()?))
        }
        FieldType::StObject => Value::Object(read_object_fields(reader, depth + 1)?),
        FieldType::StArray => {
            let mut items = Vec::new();
            loop {
                match reader.peek() {
                    None => return Err(CodecError::UnexpectedEnd),
                    Some(ARRAY_END_MARKER) => {
                        reader.read_u8()?;
                        break;
                    }
                    Some(_) => {}
                }
                let inner = reader.read_field()?;
                if inner.field_type != FieldType::StObject {
                    return Err(CodecError::InvalidValue {
                        field: def.name.to_string(),
                        reason: format!("{} is not an object field", inner.name),
                    });
                }
                let body = read_object_fields(reader, depth + 1)?;
                let mut wrapper = Map::new();
                wrapper.insert(inner.name.to_string(), Value::Object(body));
                items.push(Value::Object(wrapper));
            }
            Value::Array(items)
        }
    };
    Ok(value)
}

// =============================================================================
// Hashing
// =============================================================================

/// Transaction ID: first half of SHA-512 over `TXN\0 || blob`, uppercase hex.
pub fn transaction_hash(blob: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(TRANSACTION_ID_PREFIX);
    hasher.update(blob);
    hex::encode_upper(&hasher.finalize()[..32])
}
