// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Minimal CBOR (RFC 8949) reader and writer.
//!
//! Covers the subset that appears in UR payloads: integers, byte and text
//! strings, arrays, maps, tags and simple values. Indefinite lengths and
//! floating point values are rejected.

use thiserror::Error;

/// Maximum nesting depth accepted by the reader.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CborValue {
    Unsigned(u64),
    /// Negative integer, stored as the encoded argument `n` meaning `-1 - n`.
    Negative(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(Vec<(CborValue, CborValue)>),
    Tag(u64, Box<CborValue>),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CborError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unsupported CBOR item: {0}")]
    Unsupported(String),

    #[error("invalid UTF-8 in text string")]
    InvalidUtf8,

    #[error("nesting too deep")]
    TooDeep,

    #[error("{0} trailing bytes after CBOR item")]
    TrailingBytes(usize),
}

impl CborValue {
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            CborValue::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Look up a text key in a map value.
    pub fn get(&self, key: &str) -> Option<&CborValue> {
        match self {
            CborValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Strip any number of tags wrapping the value.
    pub fn untagged(&self) -> &CborValue {
        let mut value = self;
        while let CborValue::Tag(_, inner) = value {
            value = inner;
        }
        value
    }
}

/// Decode exactly one CBOR item from `data`.
pub fn decode(data: &[u8]) -> Result<CborValue, CborError> {
    let mut reader = Reader { data, pos: 0 };
    let value = reader.read_item(0)?;
    let rest = data.len() - reader.pos;
    if rest != 0 {
        return Err(CborError::TrailingBytes(rest));
    }
    Ok(value)
}

/// Encode a CBOR item.
pub fn encode(value: &CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    write_item(&mut out, value);
    out
}

/// Encode `data` as a CBOR byte string (the `bytes` UR type body).
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 9);
    write_head(&mut out, 2, data.len() as u64);
    out.extend_from_slice(data);
    out
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], CborError> {
        let end = self.pos.checked_add(n).ok_or(CborError::UnexpectedEnd)?;
        if end > self.data.len() {
            return Err(CborError::UnexpectedEnd);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_argument(&mut self, info: u8) -> Result<u64, CborError> {
        match info {
            0..=23 => Ok(info as u64),
            24 => Ok(self.take(1)?[0] as u64),
            25 => {
                let b = self.take(2)?;
                Ok(u16::from_be_bytes([b[0], b[1]]) as u64)
            }
            26 => {
                let b = self.take(4)?;
                Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
            }
            27 => {
                let b = self.take(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(b);
                Ok(u64::from_be_bytes(buf))
            }
            31 => Err(CborError::Unsupported("indefinite length".to_string())),
            _ => Err(CborError::Unsupported(format!(
                "reserved additional info {info}"
            ))),
        }
    }

    fn read_len(&mut self, info: u8) -> Result<usize, CborError> {
        let len = self.read_argument(info)?;
        let len = usize::try_from(len).map_err(|_| CborError::UnexpectedEnd)?;
        // Every element needs at least one byte, so this bounds preallocation.
        if len > self.data.len() - self.pos {
            return Err(CborError::UnexpectedEnd);
        }
        Ok(len)
    }

    fn read_item(&mut self, depth: usize) -> Result<CborValue, CborError> {
        if depth > MAX_DEPTH {
            return Err(CborError::TooDeep);
        }
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1F;

        match major {
            0 => Ok(CborValue::Unsigned(self.read_argument(info)?)),
            1 => Ok(CborValue::Negative(self.read_argument(info)?)),
            2 => {
                let len = self.read_len(info)?;
                Ok(CborValue::Bytes(self.take(len)?.to_vec()))
            }
            3 => {
                let len = self.read_len(info)?;
                let bytes = self.take(len)?;
                let text = std::str::from_utf8(bytes).map_err(|_| CborError::InvalidUtf8)?;
                Ok(CborValue::Text(text.to_string()))
            }
            4 => {
                let len = self.read_len(info)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_item(depth + 1)?);
                }
                Ok(CborValue::Array(items))
            }
            5 => {
                let len = self.read_len(info)?;
                let mut entries = Vec::with_capacity(len);
                for _ in 0..len {
                    let key = self.read_item(depth + 1)?;
                    let value = self.read_item(depth + 1)?;
                    entries.push((key, value));
                }
                Ok(CborValue::Map(entries))
            }
            6 => {
                let tag = self.read_argument(info)?;
                let inner = self.read_item(depth + 1)?;
                Ok(CborValue::Tag(tag, Box::new(inner)))
            }
            _ => match info {
                20 => Ok(CborValue::Bool(false)),
                21 => Ok(CborValue::Bool(true)),
                22 => Ok(CborValue::Null),
                23 => Ok(CborValue::Undefined),
                _ => Err(CborError::Unsupported(format!("simple/float value {info}"))),
            },
        }
    }
}

fn write_head(out: &mut Vec<u8>, major: u8, value: u64) {
    let major = major << 5;
    if value < 24 {
        out.push(major | value as u8);
    } else if value <= u8::MAX as u64 {
        out.push(major | 24);
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(major | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u32::MAX as u64 {
        out.push(major | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn write_item(out: &mut Vec<u8>, value: &CborValue) {
    match value {
        CborValue::Unsigned(v) => write_head(out, 0, *v),
        CborValue::Negative(v) => write_head(out, 1, *v),
        CborValue::Bytes(b) => {
            write_head(out, 2, b.len() as u64);
            out.extend_from_slice(b);
        }
        CborValue::Text(t) => {
            write_head(out, 3, t.len() as u64);
            out.extend_from_slice(t.as_bytes());
        }
        CborValue::Array(items) => {
            write_head(out, 4, items.len() as u64);
            for item in items {
                write_item(out, item);
            }
        }
        CborValue::Map(entries) => {
            write_head(out, 5, entries.len() as u64);
            for (k, v) in entries {
                write_item(out, k);
                write_item(out, v);
            }
        }
        CborValue::Tag(tag, inner) => {
            write_head(out, 6, *tag);
            write_item(out, inner);
        }
        CborValue::Bool(false) => out.push(0xF4),
        CborValue::Bool(true) => out.push(0xF5),
        CborValue::Null => out.push(0xF6),
        CborValue::Undefined => out.push(0xF7),
    }
}
