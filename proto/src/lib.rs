// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wire protocol definitions for hardware wallet communication
//!
//! Every exchange with a device is a framed [Envelope] carrying a message
//! type identifier and a protobuf-encoded payload. The mapping from type
//! identifiers to message codecs lives in a [Registry], which is assembled
//! at startup via a [RegistryBuilder] so chain extension modules (see
//! [solana], [cosmos]) can add their own message types without editing a
//! central dispatch table.
//!
//! ## Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     TYPE_ID (u32, big endian)                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      LENGTH (u32, big endian)                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                     PAYLOAD (LENGTH bytes)                    /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumString};

mod error;
pub use error::ProtocolError;

mod envelope;
pub use envelope::{Envelope, EnvelopeHeader, HEADER_LEN, MAX_PAYLOAD};

mod registry;
pub use registry::{Decoded, DynMessage, Registry, RegistryBuilder};

pub mod messages;

pub mod cosmos;

pub mod solana;

/// Core message type identifiers, shared by all devices speaking
/// the KeepKey wire protocol.
///
/// Chain extension messages (cosmos-sdk family, solana) are numbered
/// in their own modules and registered separately.
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Hash, Display, EnumString, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u32)]
pub enum MessageType {
    Initialize = 0,
    Ping = 1,
    Success = 2,
    Failure = 3,
    WipeDevice = 5,
    GetPublicKey = 11,
    PublicKey = 12,
    LoadDevice = 13,
    Features = 17,
    PinMatrixRequest = 18,
    PinMatrixAck = 19,
    Cancel = 20,
    ClearSession = 24,
    ButtonRequest = 26,
    ButtonAck = 27,
    GetAddress = 29,
    Address = 30,
    SignMessage = 38,
    MessageSignature = 40,
    PassphraseRequest = 41,
    PassphraseAck = 42,
    EthereumGetAddress = 56,
    EthereumAddress = 57,
    EthereumSignTx = 58,
    EthereumTxRequest = 59,
    EthereumTxAck = 60,
    EthereumSignMessage = 64,
    EthereumMessageSignature = 66,
    DebugLinkDecision = 100,
}

impl MessageType {
    /// Fetch the numeric type identifier
    pub const fn id(self) -> u32 {
        self as u32
    }
}

/// Build a registry containing the core message set, every supported
/// cosmos-sdk chain, and solana.
pub fn default_registry() -> Registry {
    let mut b = RegistryBuilder::new();

    messages::register(&mut b);

    for chain in cosmos::CHAINS {
        cosmos::register(&mut b, chain);
    }

    solana::register(&mut b);

    b.build()
}
