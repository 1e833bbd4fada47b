// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! XRP Ledger integration: binary codec, addresses, networks and the
//! JSON-RPC submission client.

pub mod address;
pub mod amount;
pub mod client;
pub mod codec;
pub mod definitions;
pub mod types;

pub use client::{parse_submit_response, LedgerClient, LedgerClientError, TxSubmitter};
pub use codec::{
    decode_transaction, decode_transaction_hex, encode_transaction, encode_transaction_hex,
    transaction_hash, CodecError,
};
pub use types::{Network, NetworkConfig, SubmitResult, XRPL_MAINNET, XRPL_TESTNET};
