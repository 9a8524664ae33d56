// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chain helpers for address encoding, message digests and transaction
//! serialisation, shared by host wallets and device emulators.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub mod bitcoin;

pub mod cosmos;

pub mod ethereum;

pub mod solana;

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// SHA256(SHA256(data))
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let sha = Sha256::digest(data);
    Sha256::digest(sha).into()
}

/// Bitcoin-style compact size encoding
pub(crate) fn write_varint(buff: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buff.push(n as u8),
        0xfd..=0xffff => {
            buff.push(0xfd);
            buff.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x10000..=0xffff_ffff => {
            buff.push(0xfe);
            buff.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buff.push(0xff);
            buff.extend_from_slice(&n.to_le_bytes());
        }
    }
}
