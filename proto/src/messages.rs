// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Core device messages: management, interactive requests, bitcoin,
//! ethereum, and debug link.

use crate::{MessageType, RegistryBuilder};

/// Failure codes reported by devices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FailureType {
    UnexpectedMessage = 1,
    ButtonExpected = 2,
    SyntaxError = 3,
    ActionCancelled = 4,
    PinExpected = 5,
    PinCancelled = 6,
    PinInvalid = 7,
    InvalidSignature = 8,
    Other = 9,
    NotEnoughFunds = 10,
    NotInitialized = 11,
    FirmwareError = 99,
}

/// Reason for a button confirmation request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ButtonRequestType {
    Other = 1,
    ConfirmOutput = 3,
    ProtectCall = 7,
    SignTx = 8,
    WipeDevice = 10,
    Address = 12,
    SignMessage = 14,
}

/// PIN matrix request purpose
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PinMatrixRequestType {
    Current = 1,
    NewFirst = 2,
    NewSecond = 3,
}

/// Bitcoin-family input script types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum InputScriptType {
    SpendAddress = 0,
    SpendMultisig = 1,
    External = 2,
    SpendWitness = 3,
    SpendP2shWitness = 4,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Initialize {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Features {
    #[prost(string, optional, tag = "1")]
    pub vendor: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub major_version: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub minor_version: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub patch_version: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub bootloader_mode: Option<bool>,
    #[prost(string, optional, tag = "6")]
    pub device_id: Option<String>,
    #[prost(bool, optional, tag = "7")]
    pub pin_protection: Option<bool>,
    #[prost(bool, optional, tag = "8")]
    pub passphrase_protection: Option<bool>,
    #[prost(string, optional, tag = "10")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "12")]
    pub initialized: Option<bool>,
    #[prost(bool, optional, tag = "16")]
    pub pin_cached: Option<bool>,
    #[prost(bool, optional, tag = "17")]
    pub passphrase_cached: Option<bool>,
    #[prost(string, optional, tag = "21")]
    pub model: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Ping {
    #[prost(string, optional, tag = "1")]
    pub message: Option<String>,
    #[prost(bool, optional, tag = "2")]
    pub button_protection: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    pub pin_protection: Option<bool>,
    #[prost(bool, optional, tag = "4")]
    pub passphrase_protection: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Success {
    #[prost(string, optional, tag = "1")]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Failure {
    #[prost(enumeration = "FailureType", optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

impl Failure {
    /// Create a failure message with the provided code
    pub fn new(code: FailureType, message: &str) -> Self {
        Self {
            code: Some(code as i32),
            message: Some(message.to_string()),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WipeDevice {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ClearSession {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Cancel {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LoadDevice {
    #[prost(string, optional, tag = "1")]
    pub mnemonic: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub pin: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub passphrase_protection: Option<bool>,
    #[prost(string, optional, tag = "6")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "7")]
    pub skip_checksum: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetPublicKey {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(string, optional, tag = "2")]
    pub ecdsa_curve_name: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub show_display: Option<bool>,
    #[prost(string, optional, tag = "4")]
    pub coin_name: Option<String>,
}

/// BIP32 node descriptor (public parts only)
#[derive(Clone, PartialEq, prost::Message)]
pub struct HdNode {
    #[prost(uint32, required, tag = "1")]
    pub depth: u32,
    #[prost(uint32, required, tag = "2")]
    pub fingerprint: u32,
    #[prost(uint32, required, tag = "3")]
    pub child_num: u32,
    #[prost(bytes = "vec", required, tag = "4")]
    pub chain_code: Vec<u8>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub public_key: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicKey {
    #[prost(message, optional, tag = "1")]
    pub node: Option<HdNode>,
    #[prost(string, optional, tag = "2")]
    pub xpub: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PinMatrixRequest {
    #[prost(enumeration = "PinMatrixRequestType", optional, tag = "1")]
    pub r#type: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PinMatrixAck {
    #[prost(string, required, tag = "1")]
    pub pin: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PassphraseRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PassphraseAck {
    #[prost(string, required, tag = "1")]
    pub passphrase: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonRequest {
    #[prost(enumeration = "ButtonRequestType", optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub data: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonAck {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAddress {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(string, optional, tag = "2")]
    pub coin_name: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub show_display: Option<bool>,
    #[prost(enumeration = "InputScriptType", optional, tag = "5")]
    pub script_type: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Address {
    #[prost(string, optional, tag = "1")]
    pub address: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SignMessage {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bytes = "vec", required, tag = "2")]
    pub message: Vec<u8>,
    #[prost(string, optional, tag = "3")]
    pub coin_name: Option<String>,
    #[prost(enumeration = "InputScriptType", optional, tag = "4")]
    pub script_type: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MessageSignature {
    #[prost(string, optional, tag = "1")]
    pub address: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EthereumGetAddress {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bool, optional, tag = "2")]
    pub show_display: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EthereumAddress {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub address: Option<Vec<u8>>,
    #[prost(string, optional, tag = "2")]
    pub address_str: Option<String>,
}

/// Ethereum transaction signing request.
///
/// Data beyond `data_initial_chunk` is streamed on request via
/// [EthereumTxRequest] / [EthereumTxAck].
#[derive(Clone, PartialEq, prost::Message)]
pub struct EthereumSignTx {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub nonce: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub gas_price: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub gas_limit: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub to: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub value: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub data_initial_chunk: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "8")]
    pub data_length: Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub chain_id: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub tx_type: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "11")]
    pub max_fee_per_gas: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "12")]
    pub max_priority_fee_per_gas: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EthereumTxRequest {
    #[prost(uint32, optional, tag = "1")]
    pub data_length: Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub signature_v: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub signature_r: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub signature_s: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EthereumTxAck {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub data_chunk: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EthereumSignMessage {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bytes = "vec", required, tag = "2")]
    pub message: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EthereumMessageSignature {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub address: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature: Option<Vec<u8>>,
}

/// Debug link decision, emulates a button press on test devices
#[derive(Clone, PartialEq, prost::Message)]
pub struct DebugLinkDecision {
    #[prost(bool, required, tag = "1")]
    pub yes_no: bool,
}

/// Register the core message set
pub fn register(b: &mut RegistryBuilder) {
    use MessageType as T;

    b.register::<Initialize>(T::Initialize.id(), "Initialize")
        .register::<Ping>(T::Ping.id(), "Ping")
        .register::<Success>(T::Success.id(), "Success")
        .register::<Failure>(T::Failure.id(), "Failure")
        .register::<WipeDevice>(T::WipeDevice.id(), "WipeDevice")
        .register::<GetPublicKey>(T::GetPublicKey.id(), "GetPublicKey")
        .register::<PublicKey>(T::PublicKey.id(), "PublicKey")
        .register::<LoadDevice>(T::LoadDevice.id(), "LoadDevice")
        .register::<Features>(T::Features.id(), "Features")
        .register::<PinMatrixRequest>(T::PinMatrixRequest.id(), "PinMatrixRequest")
        .register::<PinMatrixAck>(T::PinMatrixAck.id(), "PinMatrixAck")
        .register::<Cancel>(T::Cancel.id(), "Cancel")
        .register::<ClearSession>(T::ClearSession.id(), "ClearSession")
        .register::<ButtonRequest>(T::ButtonRequest.id(), "ButtonRequest")
        .register::<ButtonAck>(T::ButtonAck.id(), "ButtonAck")
        .register::<GetAddress>(T::GetAddress.id(), "GetAddress")
        .register::<Address>(T::Address.id(), "Address")
        .register::<SignMessage>(T::SignMessage.id(), "SignMessage")
        .register::<MessageSignature>(T::MessageSignature.id(), "MessageSignature")
        .register::<PassphraseRequest>(T::PassphraseRequest.id(), "PassphraseRequest")
        .register::<PassphraseAck>(T::PassphraseAck.id(), "PassphraseAck")
        .register::<EthereumGetAddress>(T::EthereumGetAddress.id(), "EthereumGetAddress")
        .register::<EthereumAddress>(T::EthereumAddress.id(), "EthereumAddress")
        .register::<EthereumSignTx>(T::EthereumSignTx.id(), "EthereumSignTx")
        .register::<EthereumTxRequest>(T::EthereumTxRequest.id(), "EthereumTxRequest")
        .register::<EthereumTxAck>(T::EthereumTxAck.id(), "EthereumTxAck")
        .register::<EthereumSignMessage>(T::EthereumSignMessage.id(), "EthereumSignMessage")
        .register::<EthereumMessageSignature>(
            T::EthereumMessageSignature.id(),
            "EthereumMessageSignature",
        )
        .register::<DebugLinkDecision>(T::DebugLinkDecision.id(), "DebugLinkDecision");
}
