// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scanning animated QR codes into a reassembled resource.

pub mod camera;
pub mod scanner;
pub mod session;

pub use camera::{CameraError, Facing, Frame, FrameSource, QrDecoder, Resolution};
pub use scanner::{ScanEvent, ScanOutcome, Scanner, ScannerConfig, DEFAULT_SCAN_INTERVAL};
pub use session::{ReassemblySession, ReceiveOutcome, ScanProgress};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Camera(#[from] CameraError),
}
