// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Message signing tests

use log::{debug, info};

use hdwallet::*;

use crate::{pair, reference};

/// Sign and verify a message with bitcoin and ethereum keys
pub async fn test(w: &dyn HdWallet, mnemonic: &str, message: &str) -> anyhow::Result<()> {
    let r = reference(mnemonic).await?;

    let (btc, btc_ref) = pair(w, &r, "bitcoin", |w| w.as_bitcoin())?;

    for p in btc.btc_get_account_paths(Coin::Bitcoin, 0) {
        let req = BtcSignMessage {
            coin: Coin::Bitcoin,
            address_n: p.address(0),
            script_type: p.script_type,
            message: message.as_bytes().to_vec(),
        };

        let s = btc.btc_sign_message(&req).await?;
        debug!("btc {}: {}", s.address, hex::encode(&s.signature));

        assert_eq!(s, btc_ref.btc_sign_message(&req).await?);

        // Signatures must verify against the signing address, and fail
        // for modified messages
        let mut v = BtcVerifyMessage {
            coin: Coin::Bitcoin,
            address: s.address.clone(),
            message: req.message.clone(),
            signature: s.signature.clone(),
        };
        assert!(btc_ref.btc_verify_message(&v).await?);

        v.message.push(b'!');
        assert!(!btc_ref.btc_verify_message(&v).await?);
    }

    let (eth, eth_ref) = pair(w, &r, "ethereum", |w| w.as_ethereum())?;

    let req = EthSignMessage {
        address_n: eth.eth_get_account_paths(0).remove(0),
        message: message.as_bytes().to_vec(),
    };

    let s = eth.eth_sign_message(&req).await?;
    debug!("eth {}: {}", s.address, hex::encode(&s.signature));

    assert_eq!(s, eth_ref.eth_sign_message(&req).await?);

    let ok = eth_ref
        .eth_verify_message(&EthVerifyMessage {
            address: s.address.clone(),
            message: req.message.clone(),
            signature: s.signature.clone(),
        })
        .await?;
    assert!(ok);

    info!("message signing OK");

    Ok(())
}
