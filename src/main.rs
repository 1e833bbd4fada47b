// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use airgap_xrpl_signer::{
    api::router,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    reaper::SessionReaper,
    state::{AppState, Submitters},
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Time in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let submitters = match Submitters::from_config(&config) {
        Ok(submitters) => submitters,
        Err(e) => {
            error!(error = %e, "Failed to configure ledger clients");
            std::process::exit(1);
        }
    };

    let addr = config.bind_addr;
    let tls = config.tls.clone();
    let state = AppState::new(config, submitters);

    let shutdown = CancellationToken::new();
    let reaper = SessionReaper::new(state.sessions.clone(), state.config.session_ttl);
    let reaper_task = tokio::spawn(reaper.run(shutdown.clone()));

    let handle = Handle::new();
    {
        let shutdown = shutdown.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            if wait_for_signal(&shutdown).await {
                shutdown.cancel();
                handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            }
        });
    }

    let app = router(state).into_make_service();
    let served = match tls {
        Some((cert, key)) => {
            // Must happen before any TLS operation.
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("rustls crypto provider was already installed");
            }
            let tls_config = match RustlsConfig::from_pem_file(&cert, &key).await {
                Ok(tls_config) => tls_config,
                Err(e) => {
                    error!(cert = %cert.display(), key = %key.display(), error = %e, "Failed to load TLS credentials");
                    std::process::exit(1);
                }
            };
            info!(%addr, "Air-gap signer listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app)
                .await
        }
        None => {
            info!(%addr, "Air-gap signer listening on http (docs at /docs)");
            axum_server::bind(addr).handle(handle).serve(app).await
        }
    };

    shutdown.cancel();
    if let Err(e) = reaper_task.await {
        warn!(error = %e, "Session reaper task failed");
    }
    if let Err(e) = served {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
    info!("Server stopped");
}

/// Wait for Ctrl-C. Returns `false` if the server stopped on its own first.
async fn wait_for_signal(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => {
                info!("Shutdown signal received");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for shutdown signal");
                false
            }
        },
        _ = shutdown.cancelled() => false,
    }
}
