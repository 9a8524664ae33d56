// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use hdwallet_core::helpers::ethereum::EthTx;
use hdwallet_core::{hardened, helpers::ethereum, Bip32Path};

use crate::Error;

/// SLIP-0044 coin type for Ethereum
pub const ETH_SLIP44: u32 = 60;

/// Account paths, `m/44'/60'/account'/0/0`
pub fn eth_account_paths(account: u32) -> Vec<Bip32Path> {
    vec![Bip32Path::from([
        hardened(44),
        hardened(ETH_SLIP44),
        hardened(account),
        0,
        0,
    ])]
}

#[derive(Clone, PartialEq, Debug)]
pub struct EthSignTx {
    pub address_n: Bip32Path,
    pub tx: EthTx,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct EthSignedTx {
    pub v: u64,
    pub r: Vec<u8>,
    pub s: Vec<u8>,
    /// Signed, RLP encoded, transaction
    pub serialized: Vec<u8>,
}

impl EthSignedTx {
    pub fn new(tx: &EthTx, v: u64, r: Vec<u8>, s: Vec<u8>) -> Self {
        Self {
            serialized: tx.serialize_signed(v, &r, &s),
            v,
            r,
            s,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct EthSignMessage {
    pub address_n: Bip32Path,
    pub message: Vec<u8>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct EthSignedMessage {
    /// EIP-55 checksummed address
    pub address: String,
    /// `r || s || v` signature
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct EthVerifyMessage {
    pub address: String,
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
}

/// EVM capability
#[async_trait]
pub trait EthereumWallet: Send + Sync {
    fn eth_get_account_paths(&self, account: u32) -> Vec<Bip32Path> {
        eth_account_paths(account)
    }

    /// Matching path in the following account, if `path` is an account path
    fn eth_next_account_path(&self, path: &Bip32Path) -> Option<Bip32Path> {
        super::next_account_path(path, |a| self.eth_get_account_paths(a))
    }

    /// Fetch the EIP-55 address for a path
    async fn eth_get_address(&self, req: &super::GetAddress) -> Result<String, Error>;

    async fn eth_sign_tx(&self, req: &EthSignTx) -> Result<EthSignedTx, Error>;

    /// Sign an EIP-191 personal message
    async fn eth_sign_message(&self, req: &EthSignMessage) -> Result<EthSignedMessage, Error>;

    /// Verify a personal message signature, computed locally
    async fn eth_verify_message(&self, req: &EthVerifyMessage) -> Result<bool, Error> {
        let expected = ethereum::parse_address(&req.address)?;

        match ethereum::recover_message_address(&req.message, &req.signature) {
            Ok(a) => Ok(a == expected),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn account_paths() {
        assert_eq!(
            eth_account_paths(2)[0].to_string(),
            "m/44'/60'/2'/0/0"
        );
    }
}
