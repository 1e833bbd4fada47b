// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Camera and QR decoding seams.
//!
//! The host platform supplies a [`FrameSource`] (camera stream) and a
//! [`QrDecoder`] (image to text). The scanner only depends on these traits.

use async_trait::async_trait;

/// Capture size requested from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Default capture size: 720p is enough for dense animated QR codes.
pub const TARGET_RESOLUTION: Resolution = Resolution {
    width: 1280,
    height: 720,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    /// Environment-facing camera.
    #[default]
    Rear,
    Front,
}

/// One sampled frame (8-bit luminance, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub luma: Vec<u8>,
}

/// Camera failures. All of them are shown with a "try again" action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("No camera found on this device")]
    NoCamera,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera error: {0}")]
    Device(String),
}

/// A live camera stream.
#[async_trait]
pub trait FrameSource: Send {
    /// Open the stream.
    async fn acquire(&mut self, facing: Facing, resolution: Resolution)
        -> Result<(), CameraError>;

    /// Sample the current frame. `None` when no frame is ready yet.
    async fn next_frame(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Stop every track of the stream. Must be safe to call more than once.
    fn release(&mut self);
}

/// Image to text QR decoding.
#[async_trait]
pub trait QrDecoder: Send + Sync {
    /// Decoded text, or `None` when the frame holds no readable code.
    async fn decode(&self, frame: &Frame) -> Option<String>;
}
