// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Reaper
//!
//! Background task that drops signing sessions nobody has touched for the
//! configured TTL. Abandoned scans otherwise keep their partial fountain
//! state in memory forever.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, like the scanner loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::store::SessionStore;

/// Upper bound on the time between sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct SessionReaper {
    sessions: Arc<RwLock<SessionStore>>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl SessionReaper {
    pub fn new(sessions: Arc<RwLock<SessionStore>>, ttl: Duration) -> Self {
        Self {
            sessions,
            ttl,
            sweep_interval: (ttl / 4).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL),
        }
    }

    /// Run the reaper loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(reaper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            ttl_secs = self.ttl.as_secs(),
            interval_secs = self.sweep_interval.as_secs(),
            "Session reaper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session reaper shutting down");
                    return;
                }
            }

            self.sweep().await;
        }
    }

    /// Remove expired sessions; returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        let removed = self.sessions.write().await.remove_idle(self.ttl, Utc::now());
        for id in &removed {
            info!(session_id = %id, "Session reaper: dropped idle session");
        }
        removed.len()
    }
}
