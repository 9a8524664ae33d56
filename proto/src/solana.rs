// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Solana extension messages, registered at runtime via [register]

use crate::RegistryBuilder;

pub const SOLANA_GET_ADDRESS: u32 = 750;
pub const SOLANA_ADDRESS: u32 = 751;
pub const SOLANA_SIGN_TX: u32 = 752;
pub const SOLANA_SIGNED_TX: u32 = 753;

#[derive(Clone, PartialEq, prost::Message)]
pub struct SolanaGetAddress {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(string, optional, tag = "2")]
    pub coin_name: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub show_display: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SolanaAddress {
    #[prost(string, optional, tag = "1")]
    pub address: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SolanaSignTx {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(string, optional, tag = "2")]
    pub coin_name: Option<String>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub raw_tx: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SolanaSignedTx {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub signature: Option<Vec<u8>>,
}

/// Register solana message types
pub fn register(b: &mut RegistryBuilder) {
    b.register::<SolanaGetAddress>(SOLANA_GET_ADDRESS, "SolanaGetAddress")
        .register::<SolanaAddress>(SOLANA_ADDRESS, "SolanaAddress")
        .register::<SolanaSignTx>(SOLANA_SIGN_TX, "SolanaSignTx")
        .register::<SolanaSignedTx>(SOLANA_SIGNED_TX, "SolanaSignedTx");
}
