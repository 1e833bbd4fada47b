// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Offline decoder for scanned signer responses.
//!
//! Pass the QR texts as arguments, or one per line on stdin. Prints a JSON
//! report with the extracted transaction blob (or signature).
//!
//! ```text
//! decode-ur ur:bytes/1-3/... ur:bytes/2-3/... ur:bytes/3-3/...
//! {"success":true,"txBlob":"1200...","message":"Reassembled 3 of 3 parts"}
//! ```

use std::io::{self, BufRead};
use std::process::ExitCode;

use airgap_xrpl_signer::{
    scan::{ReassemblySession, ReceiveOutcome},
    signing::extract_tx_payload,
};
use clap::Parser;
use serde::Serialize;

/// Reassemble a scanned UR response and print the transaction blob as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// QR texts in scan order (`ur:bytes/...`). Read from stdin, one per line, when empty.
    fragments: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_blob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Report {
    fn ok(tx_blob: String, message: String) -> Self {
        Self {
            success: true,
            tx_blob: Some(tx_blob),
            message: Some(message),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_blob: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

fn decode<I>(fragments: I) -> Report
where
    I: IntoIterator<Item = String>,
{
    let mut session = ReassemblySession::new();
    let mut last_error = None;

    for fragment in fragments {
        match session.receive(fragment.trim()) {
            ReceiveOutcome::Complete(resource) => {
                let parts = session
                    .progress()
                    .map(|p| format!("Reassembled {} of {} parts", p.received, p.total))
                    .unwrap_or_else(|| "Decoded single-part UR".to_string());
                return match extract_tx_payload(&resource) {
                    Ok(blob) => Report::ok(blob, parts),
                    Err(e) => Report::failed(e.to_string()),
                };
            }
            ReceiveOutcome::Rejected(e) | ReceiveOutcome::ReconstructionFailed(e) => {
                last_error = Some(e.to_string());
            }
            _ => {}
        }
    }

    match (session.progress(), last_error) {
        (Some(p), _) => Report::failed(format!(
            "Incomplete: received {} of {} parts",
            p.received, p.total
        )),
        (None, Some(e)) => Report::failed(e),
        (None, None) => Report::failed("No UR fragments found"),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let report = if cli.fragments.is_empty() {
        let lines = io::stdin().lock().lines().map_while(Result::ok);
        decode(lines)
    } else {
        decode(cli.fragments)
    };

    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            return ExitCode::FAILURE;
        }
    }
    if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
