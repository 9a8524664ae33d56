// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ethereum transaction signing tests

use log::{debug, info};

use hdwallet::*;

use crate::{pair, reference};

/// Build a test transaction with `data_len` bytes of calldata,
/// legacy or EIP-1559
pub fn test_tx(data_len: usize, eip1559: bool) -> EthTx {
    let (gas_price, max_fee_per_gas, max_priority_fee_per_gas) = match eip1559 {
        true => (None, vec![0x04, 0xa8, 0x17, 0xc8, 0x00], vec![0x3b, 0x9a, 0xca, 0x00]),
        false => (Some(vec![0x04, 0xa8, 0x17, 0xc8, 0x00]), vec![], vec![]),
    };

    EthTx {
        chain_id: 1,
        nonce: vec![0x01],
        gas_price,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        gas_limit: vec![0x01, 0x86, 0xa0],
        to: hex::decode("3535353535353535353535353535353535353535").unwrap_or_default(),
        value: vec![0x0d, 0xe0, 0xb6, 0xb3, 0xa7, 0x64, 0x00, 0x00],
        data: (0..data_len).map(|i| i as u8).collect(),
    }
}

/// Sign a transaction, checking the result against a reference wallet
pub async fn test(w: &dyn HdWallet, mnemonic: &str, tx: EthTx) -> anyhow::Result<()> {
    let r = reference(mnemonic).await?;

    let (eth, eth_ref) = pair(w, &r, "ethereum", |w| w.as_ethereum())?;

    let req = EthSignTx {
        address_n: eth.eth_get_account_paths(0).remove(0),
        tx,
    };

    debug!(
        "signing tx (eip1559: {}, data: {} bytes)",
        req.tx.is_eip1559(),
        req.tx.data.len()
    );

    let s = eth.eth_sign_tx(&req).await?;
    debug!("signed: {}", hex::encode(&s.serialized));

    assert_eq!(s, eth_ref.eth_sign_tx(&req).await?);

    // Legacy transactions carry EIP-155 replay protection
    match req.tx.is_eip1559() {
        true => assert!(s.v <= 1),
        false => assert!(s.v == req.tx.chain_id * 2 + 35 || s.v == req.tx.chain_id * 2 + 36),
    }

    info!("ethereum tx OK");

    Ok(())
}
