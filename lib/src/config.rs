// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet configuration, loadable from TOML

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Transport and wallet configuration
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeout for device responses (ms)
    pub request_timeout_ms: u64,

    /// Timeout for user interaction, PIN / passphrase entry and button
    /// confirmation (ms)
    pub user_timeout_ms: u64,

    /// Open the debug link where available (emulators only)
    pub debug_link: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            user_timeout_ms: 60_000,
            debug_link: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("{}: {e}", path.as_ref().display())))?;

        Self::from_toml(&s)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn user_timeout(&self) -> Duration {
        Duration::from_millis(self.user_timeout_ms)
    }
}
