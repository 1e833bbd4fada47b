// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Camera polling loop.
//!
//! Each tick samples one frame, decodes it and feeds the text to the
//! reassembly session. The next tick is only awaited after the current
//! decode finishes, so decode attempts never overlap; ticks missed while a
//! slow decode runs are delayed rather than bunched up.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::camera::{CameraError, Facing, FrameSource, QrDecoder, Resolution, TARGET_RESOLUTION};
use super::session::{ReassemblySession, ReceiveOutcome, ScanProgress};
use super::ScanError;
use crate::config::AppConfig;
use crate::ur::ReconstructedResource;

/// Default frame sampling interval.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(400);

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub interval: Duration,
    pub facing: Facing,
    pub resolution: Resolution,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SCAN_INTERVAL,
            facing: Facing::Rear,
            resolution: TARGET_RESOLUTION,
        }
    }
}

impl From<&AppConfig> for ScannerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: config.scan_interval,
            ..Self::default()
        }
    }
}

/// Intermediate events emitted while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Progress(ScanProgress),
    /// All parts arrived but the message was invalid; scanning restarted.
    ReconstructionFailed(String),
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Complete(ReconstructedResource),
    Cancelled,
}

pub struct Scanner<S, D> {
    source: S,
    decoder: D,
    config: ScannerConfig,
}

impl<S: FrameSource, D: QrDecoder> Scanner<S, D> {
    pub fn new(source: S, decoder: D, config: ScannerConfig) -> Self {
        Self {
            source,
            decoder,
            config,
        }
    }

    /// Scan until a resource is reassembled, the token is cancelled, or the
    /// camera fails. The camera is released on every exit path.
    pub async fn run(
        &mut self,
        session: &mut ReassemblySession,
        shutdown: CancellationToken,
        events: mpsc::UnboundedSender<ScanEvent>,
    ) -> Result<ScanOutcome, ScanError> {
        tracing::info!(interval_ms = self.config.interval.as_millis() as u64, "Starting scanner");

        let acquired = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Ok(false),
            result = self.source.acquire(self.config.facing, self.config.resolution) => {
                result.map(|_| true)
            }
        };

        let outcome = match acquired {
            Ok(true) => self.poll(session, &shutdown, &events).await,
            Ok(false) => Ok(ScanOutcome::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "Camera unavailable");
                Err(ScanError::Camera(e))
            }
        };

        self.source.release();
        match &outcome {
            Ok(ScanOutcome::Complete(_)) => tracing::info!("Scanner finished"),
            Ok(ScanOutcome::Cancelled) => tracing::info!("Scanner cancelled"),
            Err(e) => tracing::warn!(error = %e, "Scanner stopped"),
        }
        outcome
    }

    async fn poll(
        &mut self,
        session: &mut ReassemblySession,
        shutdown: &CancellationToken,
        events: &mpsc::UnboundedSender<ScanEvent>,
    ) -> Result<ScanOutcome, ScanError> {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(ScanOutcome::Cancelled),
                _ = ticker.tick() => {}
            }

            let scanned = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(ScanOutcome::Cancelled),
                result = capture(&mut self.source, &self.decoder) => result?,
            };
            let Some(text) = scanned else {
                continue;
            };

            match session.receive(&text) {
                ReceiveOutcome::Complete(resource) => return Ok(ScanOutcome::Complete(resource)),
                ReceiveOutcome::Progress(progress) => {
                    let _ = events.send(ScanEvent::Progress(progress));
                }
                ReceiveOutcome::ReconstructionFailed(e) => {
                    let _ = events.send(ScanEvent::ReconstructionFailed(e.to_string()));
                }
                ReceiveOutcome::Ignored
                | ReceiveOutcome::Duplicate
                | ReceiveOutcome::Rejected(_)
                | ReceiveOutcome::AlreadySubmitted => {}
            }
        }
    }
}

async fn capture<S: FrameSource, D: QrDecoder>(
    source: &mut S,
    decoder: &D,
) -> Result<Option<String>, CameraError> {
    let Some(frame) = source.next_frame().await? else {
        return Ok(None);
    };
    Ok(decoder.decode(&frame).await)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::scan::camera::Frame;
    use crate::ur::{cbor, UrEncoder};

    #[derive(Default)]
    struct Counters {
        acquired: AtomicBool,
        released: AtomicUsize,
        decodes: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    /// Frames carry the QR text directly as bytes.
    struct ScriptedCamera {
        frames: VecDeque<String>,
        acquire_error: Option<CameraError>,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl FrameSource for ScriptedCamera {
        async fn acquire(&mut self, _: Facing, _: Resolution) -> Result<(), CameraError> {
            if let Some(e) = self.acquire_error.take() {
                return Err(e);
            }
            self.counters.acquired.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
            // Loop the animation like a device does.
            let Some(text) = self.frames.pop_front() else {
                return Ok(None);
            };
            self.frames.push_back(text.clone());
            Ok(Some(Frame {
                width: 1,
                height: 1,
                luma: text.into_bytes(),
            }))
        }

        fn release(&mut self) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SlowDecoder {
        delay: Duration,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl QrDecoder for SlowDecoder {
        async fn decode(&self, frame: &Frame) -> Option<String> {
            let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.counters.decodes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            String::from_utf8(frame.luma.clone()).ok()
        }
    }

    fn scanner(
        frames: Vec<String>,
        delay: Duration,
        interval: Duration,
    ) -> (Scanner<ScriptedCamera, SlowDecoder>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let camera = ScriptedCamera {
            frames: frames.into(),
            acquire_error: None,
            counters: counters.clone(),
        };
        let decoder = SlowDecoder {
            delay,
            counters: counters.clone(),
        };
        let config = ScannerConfig {
            interval,
            ..ScannerConfig::default()
        };
        (Scanner::new(camera, decoder, config), counters)
    }

    fn animated_parts() -> (Vec<u8>, Vec<String>) {
        let message = cbor::encode_bytes(&[0xA5; 250]);
        let mut encoder = UrEncoder::new("bytes", &message, 50).unwrap();
        let mut parts = encoder.first_pass();
        parts.insert(0, "not a ur".to_string());
        (message, parts)
    }

    #[tokio::test]
    async fn completes_and_releases_camera() {
        let (message, parts) = animated_parts();
        let total = parts.len() - 1;
        let (mut scanner, counters) = scanner(parts, Duration::ZERO, Duration::from_millis(1));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = ReassemblySession::new();

        let outcome = scanner
            .run(&mut session, CancellationToken::new(), tx)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ScanOutcome::Complete(ReconstructedResource {
                ur_type: "bytes".to_string(),
                payload: message,
            })
        );
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);

        let mut progress = Vec::new();
        while let Ok(ScanEvent::Progress(p)) = rx.try_recv() {
            progress.push(p.received);
        }
        assert_eq!(progress, (1..total).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn cancel_releases_camera_and_stops_decoding() {
        let (_, parts) = animated_parts();
        // A single part on repeat never completes.
        let (mut scanner, counters) = scanner(
            vec![parts[1].clone()],
            Duration::from_millis(5),
            Duration::from_millis(2),
        );
        let shutdown = CancellationToken::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut session = ReassemblySession::new();
            scanner.run(&mut session, token, tx).await
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        shutdown.cancel();
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);

        let after_cancel = counters.decodes.load(Ordering::SeqCst);
        assert!(after_cancel > 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counters.decodes.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn slow_decodes_never_overlap() {
        let (_, parts) = animated_parts();
        let (mut scanner, counters) = scanner(parts, Duration::from_millis(6), Duration::from_millis(1));
        let mut session = ReassemblySession::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        scanner
            .run(&mut session, CancellationToken::new(), tx)
            .await
            .unwrap();
        assert_eq!(counters.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn camera_errors_are_reported_and_release_runs() {
        let counters = Arc::new(Counters::default());
        let camera = ScriptedCamera {
            frames: VecDeque::new(),
            acquire_error: Some(CameraError::PermissionDenied),
            counters: counters.clone(),
        };
        let decoder = SlowDecoder {
            delay: Duration::ZERO,
            counters: counters.clone(),
        };
        let mut scanner = Scanner::new(camera, decoder, ScannerConfig::default());
        let mut session = ReassemblySession::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = scanner
            .run(&mut session, CancellationToken::new(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Camera(CameraError::PermissionDenied)));
        assert!(!counters.acquired.load(Ordering::SeqCst));
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert_eq!(counters.decodes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_decodes() {
        let (_, parts) = animated_parts();
        let (mut scanner, counters) = scanner(parts, Duration::ZERO, Duration::from_millis(1));
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let mut session = ReassemblySession::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = scanner.run(&mut session, shutdown, tx).await.unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(counters.decodes.load(Ordering::SeqCst), 0);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn config_takes_interval_from_app_config() {
        let app = AppConfig {
            scan_interval: Duration::from_millis(300),
            ..AppConfig::default()
        };
        let config = ScannerConfig::from(&app);
        assert_eq!(config.interval, Duration::from_millis(300));
        assert_eq!(config.facing, Facing::Rear);
        assert_eq!(config.resolution, TARGET_RESOLUTION);
    }
}
