// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Solana signing tests

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{debug, info};

use hdwallet::*;
use hdwallet_core::helpers::solana;

use crate::{pair, reference};

/// Sign a raw transaction message, verifying the signature against the
/// account address
pub async fn test(w: &dyn HdWallet, mnemonic: &str, raw_tx: &[u8]) -> anyhow::Result<()> {
    let r = reference(mnemonic).await?;

    let (sol, sol_ref) = pair(w, &r, "solana", |w| w.as_solana())?;

    let p = sol.solana_get_account_paths(0).remove(0);
    let address = sol.solana_get_address(&GetAddress::new(p.clone(), false)).await?;
    debug!("solana {}: {}", p, address);

    let req = SolanaSignTx {
        address_n: p,
        raw_tx: raw_tx.to_vec(),
    };

    let s = sol.solana_sign_tx(&req).await?;
    assert_eq!(s, sol_ref.solana_sign_tx(&req).await?);

    // Solana addresses are the base58 ed25519 public key
    let pk = VerifyingKey::from_bytes(&solana::parse_address(&address)?)?;
    let sig = Signature::from_slice(&s.signature)?;
    pk.verify(raw_tx, &sig)?;

    info!("solana tx OK");

    Ok(())
}
