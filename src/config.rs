// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `XRPL_MAINNET_RPC_URL` | JSON-RPC endpoint for mainnet submissions | `https://xrplcluster.com` |
//! | `XRPL_TESTNET_RPC_URL` | JSON-RPC endpoint for testnet submissions | `https://s.altnet.rippletest.net:51234` |
//! | `SCAN_INTERVAL_MS` | Camera frame sampling interval (300 to 500) | `400` |
//! | `COMPLETE_DISPLAY_DELAY_MS` | Delay before a signed session turns `complete` | `1500` |
//! | `UR_MAX_FRAGMENT_LEN` | Max bytes per sign-request QR fragment | `200` |
//! | `SESSION_TTL_SECS` | Idle signing sessions are dropped after this | `900` |
//! | `TLS_CERT_PATH` | PEM certificate chain; enables HTTPS with `TLS_KEY_PATH` | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const XRPL_MAINNET_RPC_URL_ENV: &str = "XRPL_MAINNET_RPC_URL";
pub const XRPL_TESTNET_RPC_URL_ENV: &str = "XRPL_TESTNET_RPC_URL";
pub const SCAN_INTERVAL_MS_ENV: &str = "SCAN_INTERVAL_MS";
pub const COMPLETE_DISPLAY_DELAY_MS_ENV: &str = "COMPLETE_DISPLAY_DELAY_MS";
pub const UR_MAX_FRAGMENT_LEN_ENV: &str = "UR_MAX_FRAGMENT_LEN";
pub const SESSION_TTL_SECS_ENV: &str = "SESSION_TTL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SCAN_INTERVAL_MS: u64 = 400;
const MIN_SCAN_INTERVAL_MS: u64 = 300;
const MAX_SCAN_INTERVAL_MS: u64 = 500;
const DEFAULT_COMPLETE_DISPLAY_DELAY_MS: u64 = 1500;
const DEFAULT_UR_MAX_FRAGMENT_LEN: usize = 200;
const DEFAULT_SESSION_TTL_SECS: u64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub mainnet_rpc_url: Option<String>,
    pub testnet_rpc_url: Option<String>,
    pub scan_interval: Duration,
    pub complete_display_delay: Duration,
    pub ur_max_fragment_len: usize,
    pub session_ttl: Duration,
    /// Certificate and key paths, when HTTPS is enabled.
    pub tls: Option<(PathBuf, PathBuf)>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            log_format: LogFormat::default(),
            mainnet_rpc_url: None,
            testnet_rpc_url: None,
            scan_interval: Duration::from_millis(DEFAULT_SCAN_INTERVAL_MS),
            complete_display_delay: Duration::from_millis(DEFAULT_COMPLETE_DISPLAY_DELAY_MS),
            ur_max_fragment_len: DEFAULT_UR_MAX_FRAGMENT_LEN,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            tls: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(var(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let log_format = match var(LOG_FORMAT_ENV).map(|v| v.to_ascii_lowercase()) {
            None => LogFormat::Pretty,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        let scan_interval_ms = parse_or(
            var(SCAN_INTERVAL_MS_ENV),
            SCAN_INTERVAL_MS_ENV,
            DEFAULT_SCAN_INTERVAL_MS,
        )?;
        if !(MIN_SCAN_INTERVAL_MS..=MAX_SCAN_INTERVAL_MS).contains(&scan_interval_ms) {
            return Err(ConfigError::Invalid {
                name: SCAN_INTERVAL_MS_ENV,
                reason: format!(
                    "must be between {MIN_SCAN_INTERVAL_MS} and {MAX_SCAN_INTERVAL_MS} ms"
                ),
            });
        }

        let ur_max_fragment_len = parse_or(
            var(UR_MAX_FRAGMENT_LEN_ENV),
            UR_MAX_FRAGMENT_LEN_ENV,
            DEFAULT_UR_MAX_FRAGMENT_LEN,
        )?;
        if ur_max_fragment_len == 0 {
            return Err(ConfigError::Invalid {
                name: UR_MAX_FRAGMENT_LEN_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        Ok(Self {
            bind_addr,
            log_format,
            mainnet_rpc_url: var(XRPL_MAINNET_RPC_URL_ENV),
            testnet_rpc_url: var(XRPL_TESTNET_RPC_URL_ENV),
            scan_interval: Duration::from_millis(scan_interval_ms),
            complete_display_delay: Duration::from_millis(parse_or(
                var(COMPLETE_DISPLAY_DELAY_MS_ENV),
                COMPLETE_DISPLAY_DELAY_MS_ENV,
                DEFAULT_COMPLETE_DISPLAY_DELAY_MS,
            )?),
            ur_max_fragment_len,
            session_ttl: Duration::from_secs(parse_or(
                var(SESSION_TTL_SECS_ENV),
                SESSION_TTL_SECS_ENV,
                DEFAULT_SESSION_TTL_SECS,
            )?),
            tls,
        })
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("`{value}`: {e}"),
        }),
    }
}
