// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Air-Gap Signer - XRPL signing bridge for QR hardware wallets
//!
//! The unsigned transaction is shown to an offline signer as animated BC-UR
//! QR codes. The signer answers the same way; this crate reassembles the
//! answer, merges the signature into the transaction and submits it.
//!
//! ## Modules
//!
//! - `ur` - BC-UR parsing, fountain decoding and encoding
//! - `scan` - Fragment deduplication, progress and the camera polling loop
//! - `xrpl` - XRPL binary codec, addresses and JSON-RPC submission
//! - `signing` - Payload extraction, signature merge and the signing flow
//! - `api` - HTTP API handlers (Axum)
//! - `reaper` - Expiry of idle signing sessions

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod reaper;
pub mod scan;
pub mod signing;
pub mod state;
pub mod store;
pub mod ur;
pub mod xrpl;
