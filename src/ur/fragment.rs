// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parsing of scanned UR strings.
//!
//! ```text
//! ur:<type>/<body>                   single part
//! ur:<type>/<seq>-<total>/<body>     multi part, seq is 1-based
//! ```
//!
//! The scheme is case-insensitive; QR alphanumeric mode renders it uppercase.

use super::UrError;

/// Scheme prefix of every UR string (lowercase form).
pub const UR_SCHEME: &str = "ur:";

/// Sequence segment of a multi-part UR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceId {
    /// 1-based sequence number. Values above `total` denote mixed parts.
    pub seq_num: u32,
    /// Number of fragments the message was split into.
    pub total: usize,
}

/// One scanned UR string, split into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub ur_type: String,
    pub sequence: Option<SequenceId>,
    pub body: String,
}

/// Whether `text` starts with the UR scheme, ignoring case.
pub fn has_ur_scheme(text: &str) -> bool {
    text.get(..UR_SCHEME.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(UR_SCHEME))
}

impl Fragment {
    pub fn parse(text: &str) -> Result<Self, UrError> {
        if !has_ur_scheme(text) {
            return Err(UrError::InvalidScheme);
        }
        let lower = text.to_ascii_lowercase();
        let path = &lower[UR_SCHEME.len()..];
        let components: Vec<&str> = path.split('/').collect();

        let (ur_type, sequence, body) = match components.as_slice() {
            [ur_type, body] => (*ur_type, None, *body),
            [ur_type, seq, body] => (*ur_type, Some(parse_sequence(seq)?), *body),
            _ => {
                return Err(UrError::InvalidSequence(format!(
                    "expected 2 or 3 path components, found {}",
                    components.len()
                )))
            }
        };

        if !is_valid_type(ur_type) {
            return Err(UrError::InvalidType(ur_type.to_string()));
        }
        if body.is_empty() {
            return Err(UrError::InvalidBytewords("empty body".to_string()));
        }

        Ok(Self {
            ur_type: ur_type.to_string(),
            sequence,
            body: body.to_string(),
        })
    }

    pub fn is_multi_part(&self) -> bool {
        self.sequence.is_some()
    }

    /// Declared fragment count; a single-part UR counts as one.
    pub fn total(&self) -> usize {
        self.sequence.map(|s| s.total).unwrap_or(1)
    }

    /// Zero-based index of the fragment this part carries, if it is a simple part.
    pub fn index(&self) -> Option<usize> {
        match self.sequence {
            None => Some(0),
            Some(seq) if (seq.seq_num as usize) <= seq.total => Some(seq.seq_num as usize - 1),
            Some(_) => None,
        }
    }
}

fn parse_sequence(segment: &str) -> Result<SequenceId, UrError> {
    let (seq, total) = segment
        .split_once('-')
        .ok_or_else(|| UrError::InvalidSequence(segment.to_string()))?;

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(seq) || !all_digits(total) {
        return Err(UrError::InvalidSequence(segment.to_string()));
    }

    let seq_num: u32 = seq
        .parse()
        .map_err(|_| UrError::InvalidSequence(segment.to_string()))?;
    let total: usize = total
        .parse()
        .map_err(|_| UrError::InvalidSequence(segment.to_string()))?;
    if seq_num == 0 || total == 0 {
        return Err(UrError::InvalidSequence(segment.to_string()));
    }

    Ok(SequenceId { seq_num, total })
}

fn is_valid_type(ur_type: &str) -> bool {
    !ur_type.is_empty()
        && ur_type
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
