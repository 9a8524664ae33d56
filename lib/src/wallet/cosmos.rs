// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use hdwallet_core::helpers::cosmos::{Coin as CosmosCoin, CosmosMsg, Fee, SignDoc};
use hdwallet_core::{engine::Error as EngineError, hardened, Bip32Path};
use hdwallet_proto::cosmos::CosmosChain;

use crate::Error;

/// Account paths, `m/44'/slip44'/account'/0/0`
pub fn cosmos_account_paths(chain: &CosmosChain, account: u32) -> Vec<Bip32Path> {
    vec![Bip32Path::from([
        hardened(44),
        hardened(chain.slip44),
        hardened(account),
        0,
        0,
    ])]
}

/// Cosmos-sdk sign request, messages in amino JSON form
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CosmosSignTx {
    pub address_n: Bip32Path,
    pub account_number: String,
    pub chain_id: String,
    pub fee: Fee,
    #[serde(default)]
    pub memo: String,
    pub sequence: String,
    pub msgs: Vec<serde_json::Value>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CosmosSignedTx {
    /// Compressed secp256k1 public key
    pub public_key: Vec<u8>,
    /// 64-byte `r || s` signature over the sign doc digest
    pub signature: Vec<u8>,
    /// Amino `StdTx` ready for broadcast
    pub tx: serde_json::Value,
}

impl CosmosSignedTx {
    /// Assemble a signed transaction from validated messages
    pub fn new(
        req: &CosmosSignTx,
        msgs: &[CosmosMsg],
        public_key: Vec<u8>,
        signature: Vec<u8>,
    ) -> Result<Self, Error> {
        let msgs = msgs
            .iter()
            .map(|m| m.to_amino())
            .collect::<Result<Vec<_>, _>>()?;

        let tx = json!({
            "msg": msgs,
            "fee": req.fee,
            "memo": req.memo,
            "signatures": [{
                "pub_key": {
                    "type": "tendermint/PubKeySecp256k1",
                    "value": BASE64_STANDARD.encode(&public_key),
                },
                "signature": BASE64_STANDARD.encode(&signature),
            }],
        });

        Ok(Self {
            public_key,
            signature,
            tx,
        })
    }
}

/// Validate a sign request against a chain, returning typed messages.
///
/// Any unsupported or malformed message rejects the whole transaction,
/// before any device interaction takes place.
pub fn validate_cosmos_tx(chain: &CosmosChain, req: &CosmosSignTx) -> Result<Vec<CosmosMsg>, Error> {
    let n = chain.name;

    if req.msgs.is_empty() {
        return Err(Error::Validation(format!("{n}: transaction has no messages")));
    }

    match req.fee.amount.as_slice() {
        [c] if c.denom == chain.denom => (),
        [c] => {
            return Err(Error::Validation(format!(
                "{n}: unsupported fee denom {} (expected {})",
                c.denom, chain.denom
            )))
        }
        _ => return Err(Error::Validation(format!("{n}: fee must be a single amount"))),
    }

    let mut msgs = Vec::with_capacity(req.msgs.len());

    for v in &req.msgs {
        let t = v.get("type").and_then(|t| t.as_str()).unwrap_or("<none>");

        let m = match CosmosMsg::from_amino(v) {
            Ok(m) => m,
            Err(EngineError::Unsupported) => {
                return Err(Error::Validation(format!(
                    "{n}: unsupported message type {t}"
                )))
            }
            Err(_) => return Err(Error::Validation(format!("{n}: malformed {t} message"))),
        };

        if m.is_staking() && !chain.staking {
            return Err(Error::Validation(format!(
                "{n}: staking message {t} not supported"
            )));
        }
        if m.is_ibc() && !chain.ibc {
            return Err(Error::Validation(format!("{n}: IBC transfers not supported")));
        }

        if let CosmosMsg::Send { amount, .. } = &m {
            if amount.len() != 1 {
                return Err(Error::Validation(format!(
                    "{n}: send must carry a single amount"
                )));
            }
        }

        if let Some(c) = m.coins().into_iter().find(|c| c.denom != chain.denom) {
            return Err(Error::Validation(format!(
                "{n}: unsupported denom {} (expected {})",
                c.denom, chain.denom
            )));
        }

        msgs.push(m);
    }

    Ok(msgs)
}

/// Build the sign document for validated messages
pub fn cosmos_sign_doc(req: &CosmosSignTx, msgs: Vec<CosmosMsg>) -> SignDoc {
    SignDoc {
        account_number: req.account_number.clone(),
        chain_id: req.chain_id.clone(),
        fee: req.fee.clone(),
        memo: req.memo.clone(),
        msgs,
        sequence: req.sequence.clone(),
    }
}

/// Cosmos-sdk family capability, parameterised by chain
#[async_trait]
pub trait CosmosWallet: Send + Sync {
    fn cosmos_get_account_paths(&self, chain: &CosmosChain, account: u32) -> Vec<Bip32Path> {
        cosmos_account_paths(chain, account)
    }

    fn cosmos_next_account_path(&self, chain: &CosmosChain, path: &Bip32Path) -> Option<Bip32Path> {
        super::next_account_path(path, |a| self.cosmos_get_account_paths(chain, a))
    }

    /// Only the chain's main network is supported
    fn cosmos_supports_network(&self, chain: &CosmosChain, chain_id: &str) -> bool {
        chain.chain_id == chain_id
    }

    /// Fetch the bech32 address for a path
    async fn cosmos_get_address(
        &self,
        chain: &CosmosChain,
        req: &super::GetAddress,
    ) -> Result<String, Error>;

    async fn cosmos_sign_tx(
        &self,
        chain: &CosmosChain,
        req: &CosmosSignTx,
    ) -> Result<CosmosSignedTx, Error>;
}
