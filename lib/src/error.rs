// Copyright (c) 2022-2023 The MobileCoin Foundation

use hdwallet_core::engine::Error as EngineError;
use hdwallet_proto::{messages::FailureType, ProtocolError};
use tokio::time::error::Elapsed;

/// Channel level errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Timeout waiting for a device response
    #[error("Timeout waiting for device response")]
    Timeout,

    /// Channel closed by the remote end
    #[error("Channel closed")]
    ChannelClosed,

    /// Device responses could not be re-aligned after an abandoned exchange
    #[error("Device out of sync")]
    OutOfSync,

    /// Channel I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Elapsed> for TransportError {
    fn from(_: Elapsed) -> Self {
        TransportError::Timeout
    }
}

/// Wallet API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Envelope or message codec error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Wallet is not loaded, a mnemonic is required
    #[error("Wallet not loaded, mnemonic required")]
    NeedsMnemonic,

    /// Operation not supported by this wallet
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Request rejected prior to any device interaction
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Failure reported by the device
    #[error("Device failure ({code:?}): {message}")]
    Failure {
        code: Option<FailureType>,
        message: String,
    },

    /// Unexpected response type
    #[error("Unexpected response (expected: {expected}, actual: {actual})")]
    UnexpectedResponse { expected: String, actual: String },

    /// Required response field not present
    #[error("Response missing field: {0}")]
    MissingField(&'static str),

    /// Engine operation failed
    #[error("Engine operation failed: {0}")]
    Engine(EngineError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No matching device
    #[error("No device found")]
    NoDevice,

    /// A device with the same id is already registered
    #[error("Device {0} already registered")]
    DuplicateDevice(String),
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NeedsMnemonic => Error::NeedsMnemonic,
            _ => Error::Engine(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(TransportError::Io(e))
    }
}

impl Error {
    /// Check whether this is a device failure with the provided code
    pub fn is_failure(&self, code: FailureType) -> bool {
        matches!(self, Error::Failure { code: Some(c), .. } if *c == code)
    }
}
