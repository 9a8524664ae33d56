// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Wire protocol errors
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum ProtocolError {
    /// No codec registered for the message type
    #[error("unknown message type: {0}")]
    UnknownType(u32),

    /// Message did not match the expected type
    #[error("unexpected message type (expected: {expected}, actual: {actual})")]
    UnexpectedType { expected: String, actual: String },

    /// Declared payload length exceeds the protocol maximum
    #[error("invalid payload length: {0}")]
    InvalidLength(usize),

    /// Frame shorter than its header or declared length
    #[error("truncated frame")]
    Truncated,

    /// Protobuf payload decoding failed
    #[error("payload decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Protobuf payload encoding failed
    #[error("payload encode failed: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Header encoding error
    #[error("header encoding: {0}")]
    Header(String),
}

impl From<encdec::Error> for ProtocolError {
    fn from(e: encdec::Error) -> Self {
        ProtocolError::Header(format!("{e:?}"))
    }
}
