// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin-family (UTXO) address and message signing helpers

use bech32::{u5, ToBase32, Variant};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, EnumVariantNames};

use super::{hash160, sha256d, write_varint};
use crate::engine::{Error, RecoverableSignature};

/// Supported bitcoin-family coins
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames, Serialize, Deserialize,
)]
pub enum Coin {
    Bitcoin,
    Testnet,
    Litecoin,
    Dogecoin,
}

impl Coin {
    /// SLIP-0044 coin type
    pub const fn slip44(&self) -> u32 {
        match self {
            Coin::Bitcoin => 0,
            Coin::Testnet => 1,
            Coin::Litecoin => 2,
            Coin::Dogecoin => 3,
        }
    }

    const fn p2pkh_version(&self) -> u8 {
        match self {
            Coin::Bitcoin => 0x00,
            Coin::Testnet => 0x6f,
            Coin::Litecoin => 0x30,
            Coin::Dogecoin => 0x1e,
        }
    }

    const fn p2sh_version(&self) -> u8 {
        match self {
            Coin::Bitcoin => 0x05,
            Coin::Testnet => 0xc4,
            Coin::Litecoin => 0x32,
            Coin::Dogecoin => 0x16,
        }
    }

    /// Segwit bech32 prefix, where supported
    pub const fn bech32_hrp(&self) -> Option<&'static str> {
        match self {
            Coin::Bitcoin => Some("bc"),
            Coin::Testnet => Some("tb"),
            Coin::Litecoin => Some("ltc"),
            Coin::Dogecoin => None,
        }
    }

    /// Signed message prefix
    pub const fn message_magic(&self) -> &'static str {
        match self {
            Coin::Bitcoin | Coin::Testnet => "Bitcoin Signed Message:\n",
            Coin::Litecoin => "Litecoin Signed Message:\n",
            Coin::Dogecoin => "Dogecoin Signed Message:\n",
        }
    }
}

/// Address script types
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    Display,
    EnumString,
    EnumVariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ScriptType {
    /// Legacy pay-to-pubkey-hash
    #[default]
    P2pkh,
    /// Segwit nested in pay-to-script-hash
    P2shP2wpkh,
    /// Native segwit
    P2wpkh,
}

impl ScriptType {
    /// Signature header offset (BIP-0137)
    const fn header_base(&self) -> u8 {
        match self {
            ScriptType::P2pkh => 31,
            ScriptType::P2shP2wpkh => 35,
            ScriptType::P2wpkh => 39,
        }
    }
}

fn base58check(version: u8, hash: &[u8; 20]) -> String {
    let mut b = Vec::with_capacity(21);
    b.push(version);
    b.extend_from_slice(hash);

    bs58::encode(b).with_check().into_string()
}

/// Encode an address for a compressed public key
pub fn address(coin: Coin, script_type: ScriptType, public_key: &[u8; 33]) -> Result<String, Error> {
    let h = hash160(public_key);

    match script_type {
        ScriptType::P2pkh => Ok(base58check(coin.p2pkh_version(), &h)),
        ScriptType::P2shP2wpkh => {
            coin.bech32_hrp().ok_or(Error::Unsupported)?;

            let mut redeem = vec![0x00, 0x14];
            redeem.extend_from_slice(&h);

            Ok(base58check(coin.p2sh_version(), &hash160(&redeem)))
        }
        ScriptType::P2wpkh => {
            let hrp = coin.bech32_hrp().ok_or(Error::Unsupported)?;

            let mut data = vec![u5::try_from_u8(0).map_err(|_| Error::EncodingFailed)?];
            data.extend(h.to_base32());

            bech32::encode(hrp, data, Variant::Bech32).map_err(|_| Error::EncodingFailed)
        }
    }
}

/// Compute the signed message digest for a coin
pub fn message_digest(coin: Coin, message: &[u8]) -> [u8; 32] {
    let magic = coin.message_magic().as_bytes();

    let mut b = Vec::with_capacity(magic.len() + message.len() + 10);
    write_varint(&mut b, magic.len() as u64);
    b.extend_from_slice(magic);
    write_varint(&mut b, message.len() as u64);
    b.extend_from_slice(message);

    sha256d(&b)
}

/// Encode a recoverable signature in the 65-byte signed message format
pub fn encode_signature(sig: &RecoverableSignature, script_type: ScriptType) -> [u8; 65] {
    let mut b = [0u8; 65];
    b[0] = script_type.header_base() + sig.recovery_id;
    b[1..].copy_from_slice(&sig.signature);
    b
}

/// Verify a 65-byte signed message against an address
pub fn verify_message(
    coin: Coin,
    address_str: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, Error> {
    if signature.len() != 65 {
        return Err(Error::InvalidSignature);
    }

    // Resolve script type and recovery id from header
    let (script_type, recovery_id) = match signature[0] {
        31..=34 => (ScriptType::P2pkh, signature[0] - 31),
        35..=38 => (ScriptType::P2shP2wpkh, signature[0] - 35),
        39..=42 => (ScriptType::P2wpkh, signature[0] - 39),
        // Uncompressed keys are not produced by this engine
        _ => return Err(Error::InvalidSignature),
    };

    let mut s = [0u8; 64];
    s.copy_from_slice(&signature[1..]);

    let sig = RecoverableSignature {
        signature: s,
        recovery_id,
    };

    let digest = message_digest(coin, message);
    let public_key = match sig.recover(&digest) {
        Ok(k) => k,
        Err(_) => return Ok(false),
    };

    Ok(address(coin, script_type, &public_key)? == address_str)
}
