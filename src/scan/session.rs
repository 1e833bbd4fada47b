// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reassembly of one scanned multi-part resource.
//!
//! A session consumes raw QR strings one at a time and yields the
//! reconstructed resource exactly once. Noise, malformed fragments and
//! repeats are absorbed so the camera loop can keep feeding frames blindly.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ur::{has_ur_scheme, Fragment, ReconstructedResource, UrDecoder, UrError};

/// Reassembly progress as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanProgress {
    /// Distinct fragments the decoder has recovered
    pub received: usize,
    /// Declared fragment count
    pub total: usize,
    /// `received / total`, 0 to 100
    pub percent: u8,
}

impl ScanProgress {
    pub fn new(received: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            (received.min(total) * 100 / total) as u8
        };
        Self {
            received,
            total,
            percent,
        }
    }
}

/// What happened to one scanned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Not a UR string.
    Ignored,
    /// Exact string already accepted earlier.
    Duplicate,
    /// Malformed or inconsistent fragment; scanning continues.
    Rejected(UrError),
    /// Fragment accepted, transfer still incomplete.
    Progress(ScanProgress),
    /// All fragments received and the resource was rebuilt.
    Complete(ReconstructedResource),
    /// The resource was already produced by this session.
    AlreadySubmitted,
    /// Every fragment arrived but the message could not be rebuilt. The
    /// session starts over so the transfer can be scanned again.
    ReconstructionFailed(UrError),
}

/// State for one scan: decoder, seen-set and the "already submitted" latch.
#[derive(Debug, Default)]
pub struct ReassemblySession {
    decoder: UrDecoder,
    seen: HashSet<String>,
    submitted: bool,
}

impl ReassemblySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one scanned string.
    pub fn receive(&mut self, raw: &str) -> ReceiveOutcome {
        let text = raw.to_lowercase();

        if !has_ur_scheme(&text) {
            return ReceiveOutcome::Ignored;
        }
        if self.submitted {
            return ReceiveOutcome::AlreadySubmitted;
        }

        let fragment = match Fragment::parse(&text) {
            Ok(fragment) => fragment,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable fragment");
                return ReceiveOutcome::Rejected(e);
            }
        };

        if !fragment.is_multi_part() {
            return match UrDecoder::decode_single(&fragment) {
                Ok(resource) => {
                    self.submitted = true;
                    tracing::info!(ur_type = %resource.ur_type, "Single-part resource scanned");
                    ReceiveOutcome::Complete(resource)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping undecodable single-part resource");
                    ReceiveOutcome::Rejected(e)
                }
            };
        }

        if self.seen.contains(&text) {
            return ReceiveOutcome::Duplicate;
        }

        if let Err(e) = self.decoder.receive_part(&fragment) {
            tracing::warn!(error = %e, "Decoder rejected fragment");
            return ReceiveOutcome::Rejected(e);
        }
        self.seen.insert(text);

        let total = fragment.total();
        let received = self.decoder.received_indexes().len();
        tracing::debug!(received, total, "Fragment accepted");

        if !(self.decoder.is_complete() && received == total) {
            return ReceiveOutcome::Progress(ScanProgress::new(received, total));
        }

        self.submitted = true;
        match self.decoder.result() {
            Ok(resource) => {
                tracing::info!(
                    ur_type = %resource.ur_type,
                    parts = total,
                    bytes = resource.payload.len(),
                    "Multi-part resource reassembled"
                );
                ReceiveOutcome::Complete(resource)
            }
            Err(e) => {
                tracing::error!(error = %e, "Reassembled resource is invalid");
                self.reset();
                ReceiveOutcome::ReconstructionFailed(e)
            }
        }
    }

    /// Current progress, once the first fragment has been accepted.
    pub fn progress(&self) -> Option<ScanProgress> {
        let total = self.decoder.expected_part_count()?;
        Some(ScanProgress::new(
            self.decoder.received_indexes().len(),
            total,
        ))
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Number of distinct strings accepted so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Drop all state and start a fresh scan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
