// Copyright (c) 2022-2023 The MobileCoin Foundation

/// [Engine][super::Engine] errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[repr(u8)]
pub enum Error {
    /// No wallet loaded
    #[error("wallet not loaded, mnemonic required")]
    NeedsMnemonic = 0x00,

    /// Invalid derivation path
    #[error("invalid derivation path")]
    InvalidPath = 0x01,

    /// Key derivation failed
    #[error("key derivation failed")]
    Derivation = 0x02,

    /// Invalid mnemonic phrase
    #[error("invalid mnemonic")]
    InvalidMnemonic = 0x03,

    /// Signing error
    #[error("signing error")]
    SignError = 0x04,

    /// Invalid key (decoding or recovery failed)
    #[error("invalid key")]
    InvalidKey = 0x05,

    /// Invalid signature encoding
    #[error("invalid signature")]
    InvalidSignature = 0x06,

    /// Address or message encoding failed
    #[error("encoding failed")]
    EncodingFailed = 0x07,

    /// Operation not supported for the requested coin or script type
    #[error("unsupported coin or script type")]
    Unsupported = 0x08,
}
