// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Solana address helpers

use crate::{engine::Error, hardened, Bip32Path};

/// SLIP-0044 coin type for Solana
pub const SLIP44: u32 = 501;

/// Account path `m/44'/501'/account'/0'`, all components hardened
pub fn account_path(account: u32) -> Bip32Path {
    Bip32Path::from([hardened(44), hardened(SLIP44), hardened(account), hardened(0)])
}

/// Base58 address for an ed25519 public key
pub fn address(public_key: &[u8; 32]) -> String {
    bs58::encode(public_key).into_string()
}

/// Parse a base58 address into the underlying public key
pub fn parse_address(s: &str) -> Result<[u8; 32], Error> {
    let b = bs58::decode(s).into_vec().map_err(|_| Error::EncodingFailed)?;
    b.try_into().map_err(|_| Error::EncodingFailed)
}
