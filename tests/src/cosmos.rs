// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Cosmos-sdk family transaction signing tests

use log::{debug, info};
use serde_json::{json, Value};

use hdwallet::{proto::cosmos::CosmosChain, *};

use crate::reference;

/// Build a `MsgSend` in amino JSON form
pub fn msg_send(from: &str, to: &str, amount: u64, denom: &str) -> Value {
    json!({
        "type": "cosmos-sdk/MsgSend",
        "value": {
            "from_address": from,
            "to_address": to,
            "amount": [{ "amount": amount.to_string(), "denom": denom }],
        }
    })
}

/// Build a sign request for the first account on a chain
pub fn sign_request(chain: &CosmosChain, address_n: Bip32Path, msgs: Vec<Value>) -> CosmosSignTx {
    CosmosSignTx {
        address_n,
        account_number: "16359".to_string(),
        chain_id: chain.chain_id.to_string(),
        fee: Fee {
            amount: vec![CosmosCoin::new(3000, chain.denom)],
            gas: "200000".to_string(),
        },
        memo: "hdwallet tests".to_string(),
        sequence: "3".to_string(),
        msgs,
    }
}

/// Sign a transfer on the provided chain, checking the result against a
/// reference wallet
pub async fn test(w: &dyn HdWallet, mnemonic: &str, chain: &CosmosChain) -> anyhow::Result<()> {
    let r = reference(mnemonic).await?;

    let c = w
        .as_cosmos_sdk(chain)
        .ok_or(Error::Unsupported("cosmos-sdk chain"))?;
    let c_ref = r
        .as_cosmos_sdk(chain)
        .ok_or(Error::Unsupported("cosmos-sdk chain"))?;

    let p = c.cosmos_get_account_paths(chain, 0).remove(0);
    let from = c.cosmos_get_address(chain, &GetAddress::new(p.clone(), false)).await?;

    let req = sign_request(
        chain,
        p,
        vec![msg_send(&from, &from, 10_000, chain.denom)],
    );

    let s = c.cosmos_sign_tx(chain, &req).await?;
    debug!("{} signed: {}", chain.name, s.tx);

    assert_eq!(s.signature.len(), 64);
    assert_eq!(s, c_ref.cosmos_sign_tx(chain, &req).await?);

    assert_eq!(s.tx["msg"][0]["value"]["from_address"], from.as_str());
    assert_eq!(s.tx["memo"], req.memo.as_str());

    info!("{} tx OK", chain.name);

    Ok(())
}
