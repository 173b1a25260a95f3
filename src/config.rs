// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

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
//! | `DATA_DIR` | Root directory for the ledger database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `WEBHOOK_SECRET` | Shared secret for webhook HMAC verification | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

/// Environment variable name for the ledger data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the webhook signing secret.
pub const WEBHOOK_SECRET_ENV: &str = "WEBHOOK_SECRET";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the redb ledger database.
    pub data_dir: PathBuf,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Shared secret the provider signs webhook bodies with.
    pub webhook_secret: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// The webhook secret is mandatory: without it every inbound event
    /// would be rejected, so refusing to start is the safer failure.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env::var(DATA_DIR_ENV)
            .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string())
            .into();
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let webhook_secret = env::var(WEBHOOK_SECRET_ENV)
            .map_err(|_| ConfigError::MissingVar(WEBHOOK_SECRET_ENV))?
            .into_bytes();

        Ok(Self {
            data_dir,
            host,
            port,
            webhook_secret,
        })
    }

    /// Path of the ledger database file inside the data directory.
    pub fn ledger_db_path(&self) -> PathBuf {
        self.data_dir.join("ledger.redb")
    }
}
