// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet interface and chain capabilities
//!
//! Every wallet implements [HdWallet], chain support is discovered at
//! runtime via the `as_*` capability probes (see [supports_bitcoin] etc.).
//! Each chain capability provides the same triad of operations,
//! `get_account_paths` (pure), `get_address` and `sign_tx`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hdwallet_core::{Bip32Path, HARDENED};
use hdwallet_proto::cosmos::CosmosChain;

use crate::Error;

mod bitcoin;
pub use bitcoin::*;

mod ethereum;
pub use ethereum::*;

mod cosmos;
pub use cosmos::*;

mod solana;
pub use solana::*;

/// Account index of a path in the `m/purpose'/coin'/account'/..` layout
fn account_index(path: &[u32]) -> Option<u32> {
    match path.get(2) {
        Some(i) if i & HARDENED != 0 => Some(i & !HARDENED),
        _ => None,
    }
}

/// Resolve the path following `path` in the next account, where `path`
/// is one of the account paths produced by `paths`
pub(crate) fn next_account_path<P, F>(path: &P, paths: F) -> Option<P>
where
    P: PartialEq + AsRef<[u32]>,
    F: Fn(u32) -> Vec<P>,
{
    let account = account_index(path.as_ref())?;
    let n = paths(account).iter().position(|p| p == path)?;

    let next = account.checked_add(1).filter(|a| a & HARDENED == 0)?;
    paths(next).into_iter().nth(n)
}

/// Address request, shared by account based chains
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GetAddress {
    pub address_n: Bip32Path,
    #[serde(default)]
    pub show_display: bool,
}

impl GetAddress {
    pub fn new(address_n: impl Into<Bip32Path>, show_display: bool) -> Self {
        Self {
            address_n: address_n.into(),
            show_display,
        }
    }
}

/// Ping request
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Ping {
    pub message: String,
    /// Require button confirmation
    pub button: bool,
}

/// Device load request
#[derive(Clone, PartialEq, Debug, Default)]
pub struct LoadDevice {
    pub mnemonic: String,
    pub pin: Option<String>,
    pub passphrase_protection: bool,
    pub label: Option<String>,
    pub skip_checksum: bool,
}

/// Public key request
#[derive(Clone, PartialEq, Debug)]
pub struct GetPublicKey {
    pub address_n: Bip32Path,
    pub coin_name: Option<String>,
    pub show_display: bool,
}

/// Extended public key response
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct PublicKey {
    pub xpub: String,
}

/// Wallet feature summary
#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct Features {
    pub vendor: String,
    pub model: String,
    pub device_id: String,
    pub firmware_version: String,
    pub label: String,
    pub initialized: bool,
    pub pin_protection: bool,
    pub passphrase_protection: bool,
}

/// Common wallet interface, implemented by device and software wallets
#[async_trait]
pub trait HdWallet: Send + Sync {
    /// Wallet vendor, also used as the keyring wallet type
    fn vendor(&self) -> &str;

    /// Unique device identifier
    fn device_id(&self) -> &str;

    /// Initialise the wallet session, returning device features
    async fn initialize(&self) -> Result<Features, Error>;

    /// Fetch device features (cached where available)
    async fn features(&self) -> Result<Features, Error>;

    async fn model(&self) -> Result<String, Error> {
        Ok(self.features().await?.model)
    }

    async fn firmware_version(&self) -> Result<String, Error> {
        Ok(self.features().await?.firmware_version)
    }

    async fn label(&self) -> Result<String, Error> {
        Ok(self.features().await?.label)
    }

    async fn ping(&self, req: &Ping) -> Result<String, Error>;

    /// Wipe the wallet, discarding all key material
    async fn wipe(&self) -> Result<(), Error>;

    /// Load a mnemonic
    async fn load_device(&self, req: &LoadDevice) -> Result<(), Error>;

    /// Clear cached PIN / passphrase session state
    async fn clear_session(&self) -> Result<(), Error>;

    /// Close the underlying transport
    async fn disconnect(&self) -> Result<(), Error>;

    /// Reply to a pending PIN request
    async fn send_pin(&self, pin: &str) -> Result<(), Error>;

    /// Reply to a pending passphrase request
    async fn send_passphrase(&self, passphrase: &str) -> Result<(), Error>;

    /// Cancel the pending operation
    async fn cancel(&self) -> Result<(), Error>;

    /// Fetch extended public keys for a set of paths
    async fn get_public_keys(&self, req: &[GetPublicKey]) -> Result<Vec<PublicKey>, Error>;

    fn as_bitcoin(&self) -> Option<&dyn BitcoinWallet> {
        None
    }

    fn as_ethereum(&self) -> Option<&dyn EthereumWallet> {
        None
    }

    fn as_cosmos_sdk(&self, _chain: &CosmosChain) -> Option<&dyn CosmosWallet> {
        None
    }

    fn as_solana(&self) -> Option<&dyn SolanaWallet> {
        None
    }

    fn as_debug_link(&self) -> Option<&dyn DebugLinkWallet> {
        None
    }
}

/// Debug link, for emulators and test devices
#[async_trait]
pub trait DebugLinkWallet: Send + Sync {
    async fn press_yes(&self) -> Result<(), Error>;

    async fn press_no(&self) -> Result<(), Error>;
}

pub fn supports_bitcoin(w: &dyn HdWallet) -> bool {
    w.as_bitcoin().is_some()
}

pub fn supports_ethereum(w: &dyn HdWallet) -> bool {
    w.as_ethereum().is_some()
}

pub fn supports_cosmos_sdk(w: &dyn HdWallet, chain: &CosmosChain) -> bool {
    w.as_cosmos_sdk(chain).is_some()
}

pub fn supports_solana(w: &dyn HdWallet) -> bool {
    w.as_solana().is_some()
}

pub fn supports_debug_link(w: &dyn HdWallet) -> bool {
    w.as_debug_link().is_some()
}
