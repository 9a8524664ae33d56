// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Common tests for hardware and software wallets.
//!
//! Generic over [HdWallet] for reuse against native wallets, emulators
//! and physical devices. Results are checked against a reference
//! [NativeWallet] loaded with the same mnemonic, signatures are
//! deterministic so device and reference outputs must match exactly.

use hdwallet::{HdWallet, NativeWallet};

pub mod address;

pub mod message;

pub mod ethereum;

pub mod cosmos;

pub mod solana;

/// Mnemonic for known vector tests
pub const TEST_MNEMONIC: &str =
    "alcohol woman abuse must during monitor noble actual mixed trade anger aisle";

/// Create a reference wallet for the provided mnemonic
pub async fn reference(mnemonic: &str) -> anyhow::Result<NativeWallet> {
    let w = NativeWallet::new("reference", "reference");
    w.load_mnemonic(mnemonic, "").await?;
    Ok(w)
}

/// Fetch a capability from both wallets, failing if the wallet under
/// test does not support it
pub(crate) fn pair<'a, T: ?Sized>(
    w: &'a dyn HdWallet,
    r: &'a NativeWallet,
    name: &str,
    f: impl Fn(&'a dyn HdWallet) -> Option<&'a T>,
) -> anyhow::Result<(&'a T, &'a T)> {
    match (f(w), f(r as &dyn HdWallet)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(anyhow::anyhow!("{} unsupported by {}", name, w.vendor())),
    }
}
