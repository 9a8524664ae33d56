// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hdwallet_core::{helpers::solana, Bip32Path};

use crate::Error;

/// Account paths, `m/44'/501'/account'/0'`
pub fn solana_account_paths(account: u32) -> Vec<Bip32Path> {
    vec![solana::account_path(account)]
}

/// Ed25519 derivation is hardened only, reject anything else up front
pub fn check_solana_path(p: &Bip32Path) -> Result<(), Error> {
    match p.is_fully_hardened() {
        true => Ok(()),
        false => Err(Error::Validation(format!(
            "solana path {p} must be fully hardened"
        ))),
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SolanaSignTx {
    pub address_n: Bip32Path,
    /// Serialized transaction message
    pub raw_tx: Vec<u8>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SolanaSignedTx {
    /// 64-byte ed25519 signature
    pub signature: Vec<u8>,
}

/// Solana capability
#[async_trait]
pub trait SolanaWallet: Send + Sync {
    fn solana_get_account_paths(&self, account: u32) -> Vec<Bip32Path> {
        solana_account_paths(account)
    }

    fn solana_next_account_path(&self, path: &Bip32Path) -> Option<Bip32Path> {
        super::next_account_path(path, |a| self.solana_get_account_paths(a))
    }

    /// Fetch the base58 address for a path
    async fn solana_get_address(&self, req: &super::GetAddress) -> Result<String, Error>;

    async fn solana_sign_tx(&self, req: &SolanaSignTx) -> Result<SolanaSignedTx, Error>;
}
