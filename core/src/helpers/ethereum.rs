// Copyright (c) 2022-2023 The MobileCoin Foundation

//! EVM address, message and transaction helpers

use sha3::{Digest, Keccak256};

use crate::engine::{Error, RecoverableSignature};

/// Keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Compute an address from an uncompressed (`0x04` prefixed) public key
pub fn address(uncompressed: &[u8; 65]) -> [u8; 20] {
    let h = keccak256(&uncompressed[1..]);

    let mut a = [0u8; 20];
    a.copy_from_slice(&h[12..]);
    a
}

/// Encode an address with EIP-55 mixed-case checksum
pub fn to_checksum(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let h = keccak256(lower.as_bytes());

    let mut s = String::with_capacity(42);
    s.push_str("0x");

    for (i, c) in lower.chars().enumerate() {
        let nibble = (h[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        match c.is_ascii_alphabetic() && nibble >= 8 {
            true => s.push(c.to_ascii_uppercase()),
            false => s.push(c),
        }
    }

    s
}

/// Parse a hex address, with or without `0x` prefix
pub fn parse_address(s: &str) -> Result<[u8; 20], Error> {
    let mut a = [0u8; 20];
    hex::decode_to_slice(s.trim_start_matches("0x"), &mut a).map_err(|_| Error::EncodingFailed)?;
    Ok(a)
}

/// EIP-191 personal message digest
pub fn personal_digest(message: &[u8]) -> [u8; 32] {
    let mut b = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    b.extend_from_slice(message);

    keccak256(&b)
}

/// Encode a recoverable signature as `r || s || v` with `v = 27 + recovery_id`
pub fn encode_message_signature(sig: &RecoverableSignature) -> [u8; 65] {
    let mut b = [0u8; 65];
    b[..64].copy_from_slice(&sig.signature);
    b[64] = 27 + sig.recovery_id;
    b
}

/// Recover the signing address for a personal message signature
pub fn recover_message_address(message: &[u8], signature: &[u8]) -> Result<[u8; 20], Error> {
    if signature.len() != 65 {
        return Err(Error::InvalidSignature);
    }

    let recovery_id = match signature[64] {
        v @ 27..=28 => v - 27,
        v @ 0..=1 => v,
        _ => return Err(Error::InvalidSignature),
    };

    let mut s = [0u8; 64];
    s.copy_from_slice(&signature[..64]);

    let sig = RecoverableSignature {
        signature: s,
        recovery_id,
    };
    let compressed = sig.recover(&personal_digest(message))?;

    let vk = k256::PublicKey::from_sec1_bytes(&compressed).map_err(|_| Error::InvalidKey)?;
    let p = k256::elliptic_curve::sec1::ToEncodedPoint::to_encoded_point(&vk, false);

    let mut uncompressed = [0u8; 65];
    uncompressed.copy_from_slice(p.as_bytes());

    Ok(address(&uncompressed))
}

/// Minimal RLP encoder
pub mod rlp {
    /// Strip leading zero bytes from a big-endian integer
    pub fn trim(b: &[u8]) -> &[u8] {
        let n = b.iter().take_while(|v| **v == 0).count();
        &b[n..]
    }

    fn length_prefix(out: &mut Vec<u8>, len: usize, offset: u8) {
        if len < 56 {
            out.push(offset + len as u8);
        } else {
            let l = (len as u64).to_be_bytes();
            let l = trim(&l);
            out.push(offset + 55 + l.len() as u8);
            out.extend_from_slice(l);
        }
    }

    /// Encode a byte string
    pub fn bytes(out: &mut Vec<u8>, b: &[u8]) {
        if b.len() == 1 && b[0] < 0x80 {
            out.push(b[0]);
        } else {
            length_prefix(out, b.len(), 0x80);
            out.extend_from_slice(b);
        }
    }

    /// Encode a big-endian integer (leading zeros stripped)
    pub fn uint(out: &mut Vec<u8>, b: &[u8]) {
        bytes(out, trim(b))
    }

    /// Encode a u64 integer
    pub fn u64(out: &mut Vec<u8>, v: u64) {
        uint(out, &v.to_be_bytes())
    }

    /// Wrap pre-encoded items in a list
    pub fn list(items: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(items.len() + 9);
        length_prefix(&mut out, items.len(), 0xc0);
        out.extend_from_slice(items);
        out
    }
}

/// EVM transaction for signing.
///
/// Numeric fields are big-endian byte strings, matching the device protocol.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct EthTx {
    pub chain_id: u64,
    pub nonce: Vec<u8>,
    /// Legacy gas price, `None` selects an EIP-1559 transaction
    pub gas_price: Option<Vec<u8>>,
    pub max_fee_per_gas: Vec<u8>,
    pub max_priority_fee_per_gas: Vec<u8>,
    pub gas_limit: Vec<u8>,
    /// Recipient, empty for contract creation
    pub to: Vec<u8>,
    pub value: Vec<u8>,
    pub data: Vec<u8>,
}

/// EIP-2718 type for dynamic fee transactions
const EIP1559_TX_TYPE: u8 = 0x02;

impl EthTx {
    /// Check whether this is an EIP-1559 transaction
    pub fn is_eip1559(&self) -> bool {
        self.gas_price.is_none()
    }

    fn legacy_fields(&self, out: &mut Vec<u8>, gas_price: &[u8]) {
        rlp::uint(out, &self.nonce);
        rlp::uint(out, gas_price);
        rlp::uint(out, &self.gas_limit);
        rlp::bytes(out, &self.to);
        rlp::uint(out, &self.value);
        rlp::bytes(out, &self.data);
    }

    fn eip1559_fields(&self, out: &mut Vec<u8>) {
        rlp::u64(out, self.chain_id);
        rlp::uint(out, &self.nonce);
        rlp::uint(out, &self.max_priority_fee_per_gas);
        rlp::uint(out, &self.max_fee_per_gas);
        rlp::uint(out, &self.gas_limit);
        rlp::bytes(out, &self.to);
        rlp::uint(out, &self.value);
        rlp::bytes(out, &self.data);
        // Empty access list
        out.push(0xc0);
    }

    /// Compute the signing payload (EIP-155 for legacy transactions)
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut items = vec![];

        match &self.gas_price {
            Some(gas_price) => {
                self.legacy_fields(&mut items, gas_price);
                rlp::u64(&mut items, self.chain_id);
                rlp::u64(&mut items, 0);
                rlp::u64(&mut items, 0);
                rlp::list(&items)
            }
            None => {
                self.eip1559_fields(&mut items);
                let mut out = vec![EIP1559_TX_TYPE];
                out.extend(rlp::list(&items));
                out
            }
        }
    }

    /// Compute the signing digest
    pub fn signing_digest(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Compute the `v` value for a signature with the provided recovery id
    pub fn signature_v(&self, recovery_id: u8) -> u64 {
        match self.is_eip1559() {
            true => recovery_id as u64,
            false => self.chain_id * 2 + 35 + recovery_id as u64,
        }
    }

    /// Serialize the signed transaction
    pub fn serialize_signed(&self, v: u64, r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut items = vec![];

        match &self.gas_price {
            Some(gas_price) => {
                self.legacy_fields(&mut items, gas_price);
                rlp::u64(&mut items, v);
                rlp::uint(&mut items, r);
                rlp::uint(&mut items, s);
                rlp::list(&items)
            }
            None => {
                self.eip1559_fields(&mut items);
                rlp::u64(&mut items, v);
                rlp::uint(&mut items, r);
                rlp::uint(&mut items, s);
                let mut out = vec![EIP1559_TX_TYPE];
                out.extend(rlp::list(&items));
                out
            }
        }
    }
}
