// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Cosmos-SDK family messages, amino sign documents and addresses.
//!
//! Both host wallets and emulators build the same canonical (sorted-key,
//! compact) amino JSON [SignDoc] so a given seed always produces the same
//! signature regardless of where signing happens.

use bech32::{ToBase32, Variant};
use hdwallet_proto::cosmos::{
    cosmos_msg_ack::Msg as AckMsg, CosmosMsgAck, CosmosMsgDelegate, CosmosMsgIbcTransfer,
    CosmosMsgRedelegate, CosmosMsgRewards, CosmosMsgSend,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::hash160;
use crate::engine::Error;

/// Encode a bech32 account address for a compressed public key
pub fn address(hrp: &str, public_key: &[u8; 33]) -> Result<String, Error> {
    let h = hash160(public_key);
    bech32::encode(hrp, h.to_base32(), Variant::Bech32).map_err(|_| Error::EncodingFailed)
}

/// Amount and denomination
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Coin {
    pub amount: String,
    pub denom: String,
}

impl Coin {
    pub fn new(amount: impl ToString, denom: &str) -> Self {
        Self {
            amount: amount.to_string(),
            denom: denom.to_string(),
        }
    }
}

/// IBC timeout height
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Height {
    pub revision_number: String,
    pub revision_height: String,
}

/// Supported cosmos-sdk messages, in amino JSON form
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CosmosMsg {
    #[serde(rename = "cosmos-sdk/MsgSend")]
    Send {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },
    #[serde(rename = "cosmos-sdk/MsgDelegate")]
    Delegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    #[serde(rename = "cosmos-sdk/MsgUndelegate")]
    Undelegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    #[serde(rename = "cosmos-sdk/MsgBeginRedelegate")]
    Redelegate {
        delegator_address: String,
        validator_src_address: String,
        validator_dst_address: String,
        amount: Coin,
    },
    #[serde(rename = "cosmos-sdk/MsgWithdrawDelegationReward")]
    WithdrawReward {
        delegator_address: String,
        validator_address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Coin>,
    },
    #[serde(rename = "cosmos-sdk/MsgTransfer")]
    IbcTransfer {
        source_port: String,
        source_channel: String,
        token: Coin,
        sender: String,
        receiver: String,
        timeout_height: Height,
    },
}

/// Amino type names for supported messages
pub const AMINO_TYPES: &[&str] = &[
    "cosmos-sdk/MsgSend",
    "cosmos-sdk/MsgDelegate",
    "cosmos-sdk/MsgUndelegate",
    "cosmos-sdk/MsgBeginRedelegate",
    "cosmos-sdk/MsgWithdrawDelegationReward",
    "cosmos-sdk/MsgTransfer",
];

impl CosmosMsg {
    /// Amino type name
    pub fn amino_type(&self) -> &'static str {
        match self {
            CosmosMsg::Send { .. } => AMINO_TYPES[0],
            CosmosMsg::Delegate { .. } => AMINO_TYPES[1],
            CosmosMsg::Undelegate { .. } => AMINO_TYPES[2],
            CosmosMsg::Redelegate { .. } => AMINO_TYPES[3],
            CosmosMsg::WithdrawReward { .. } => AMINO_TYPES[4],
            CosmosMsg::IbcTransfer { .. } => AMINO_TYPES[5],
        }
    }

    /// Parse an amino JSON message.
    ///
    /// Returns [Error::Unsupported] for unknown message types and
    /// [Error::EncodingFailed] for malformed known messages.
    pub fn from_amino(v: &serde_json::Value) -> Result<Self, Error> {
        let t = v.get("type").and_then(|t| t.as_str()).unwrap_or_default();
        if !AMINO_TYPES.contains(&t) {
            return Err(Error::Unsupported);
        }

        serde_json::from_value(v.clone()).map_err(|_| Error::EncodingFailed)
    }

    /// Encode to an amino JSON value
    pub fn to_amino(&self) -> Result<serde_json::Value, Error> {
        serde_json::to_value(self).map_err(|_| Error::EncodingFailed)
    }

    /// Coins moved by this message
    pub fn coins(&self) -> Vec<&Coin> {
        match self {
            CosmosMsg::Send { amount, .. } => amount.iter().collect(),
            CosmosMsg::Delegate { amount, .. }
            | CosmosMsg::Undelegate { amount, .. }
            | CosmosMsg::Redelegate { amount, .. } => vec![amount],
            CosmosMsg::WithdrawReward { amount, .. } => amount.iter().collect(),
            CosmosMsg::IbcTransfer { token, .. } => vec![token],
        }
    }

    /// Staking module message
    pub fn is_staking(&self) -> bool {
        matches!(
            self,
            CosmosMsg::Delegate { .. }
                | CosmosMsg::Undelegate { .. }
                | CosmosMsg::Redelegate { .. }
                | CosmosMsg::WithdrawReward { .. }
        )
    }

    /// IBC module message
    pub fn is_ibc(&self) -> bool {
        matches!(self, CosmosMsg::IbcTransfer { .. })
    }

    /// Convert to the device acknowledgement form.
    ///
    /// The device protocol carries a single amount for sends.
    pub fn to_ack(&self) -> Result<CosmosMsgAck, Error> {
        let msg = match self.clone() {
            CosmosMsg::Send {
                from_address,
                to_address,
                amount,
            } => {
                let [c]: [Coin; 1] = amount.try_into().map_err(|_| Error::Unsupported)?;
                AckMsg::Send(CosmosMsgSend {
                    from_address: Some(from_address),
                    to_address: Some(to_address),
                    amount: Some(c.amount),
                    denom: Some(c.denom),
                })
            }
            CosmosMsg::Delegate {
                delegator_address,
                validator_address,
                amount,
            } => AckMsg::Delegate(CosmosMsgDelegate {
                delegator_address: Some(delegator_address),
                validator_address: Some(validator_address),
                amount: Some(amount.amount),
                denom: Some(amount.denom),
            }),
            CosmosMsg::Undelegate {
                delegator_address,
                validator_address,
                amount,
            } => AckMsg::Undelegate(CosmosMsgDelegate {
                delegator_address: Some(delegator_address),
                validator_address: Some(validator_address),
                amount: Some(amount.amount),
                denom: Some(amount.denom),
            }),
            CosmosMsg::Redelegate {
                delegator_address,
                validator_src_address,
                validator_dst_address,
                amount,
            } => AckMsg::Redelegate(CosmosMsgRedelegate {
                delegator_address: Some(delegator_address),
                validator_src_address: Some(validator_src_address),
                validator_dst_address: Some(validator_dst_address),
                amount: Some(amount.amount),
                denom: Some(amount.denom),
            }),
            CosmosMsg::WithdrawReward {
                delegator_address,
                validator_address,
                amount,
            } => {
                let (amount, denom) = match amount {
                    Some(c) => (Some(c.amount), Some(c.denom)),
                    None => (None, None),
                };
                AckMsg::Rewards(CosmosMsgRewards {
                    delegator_address: Some(delegator_address),
                    validator_address: Some(validator_address),
                    amount,
                    denom,
                })
            }
            CosmosMsg::IbcTransfer {
                source_port,
                source_channel,
                token,
                sender,
                receiver,
                timeout_height,
            } => AckMsg::IbcTransfer(CosmosMsgIbcTransfer {
                source_port: Some(source_port),
                source_channel: Some(source_channel),
                denom: Some(token.denom),
                amount: Some(token.amount),
                sender: Some(sender),
                receiver: Some(receiver),
                revision_number: Some(timeout_height.revision_number),
                revision_height: Some(timeout_height.revision_height),
            }),
        };

        Ok(CosmosMsgAck { msg: Some(msg) })
    }

    /// Rebuild a message from the device acknowledgement form
    pub fn from_ack(ack: &CosmosMsgAck) -> Result<Self, Error> {
        let s = |v: &Option<String>| v.clone().unwrap_or_default();
        let coin = |amount: &Option<String>, denom: &Option<String>| Coin {
            amount: s(amount),
            denom: s(denom),
        };

        let m = match ack.msg.as_ref().ok_or(Error::EncodingFailed)? {
            AckMsg::Send(m) => CosmosMsg::Send {
                from_address: s(&m.from_address),
                to_address: s(&m.to_address),
                amount: vec![coin(&m.amount, &m.denom)],
            },
            AckMsg::Delegate(m) => CosmosMsg::Delegate {
                delegator_address: s(&m.delegator_address),
                validator_address: s(&m.validator_address),
                amount: coin(&m.amount, &m.denom),
            },
            AckMsg::Undelegate(m) => CosmosMsg::Undelegate {
                delegator_address: s(&m.delegator_address),
                validator_address: s(&m.validator_address),
                amount: coin(&m.amount, &m.denom),
            },
            AckMsg::Redelegate(m) => CosmosMsg::Redelegate {
                delegator_address: s(&m.delegator_address),
                validator_src_address: s(&m.validator_src_address),
                validator_dst_address: s(&m.validator_dst_address),
                amount: coin(&m.amount, &m.denom),
            },
            AckMsg::Rewards(m) => CosmosMsg::WithdrawReward {
                delegator_address: s(&m.delegator_address),
                validator_address: s(&m.validator_address),
                amount: m.denom.as_ref().map(|_| coin(&m.amount, &m.denom)),
            },
            AckMsg::IbcTransfer(m) => CosmosMsg::IbcTransfer {
                source_port: s(&m.source_port),
                source_channel: s(&m.source_channel),
                token: coin(&m.amount, &m.denom),
                sender: s(&m.sender),
                receiver: s(&m.receiver),
                timeout_height: Height {
                    revision_number: s(&m.revision_number),
                    revision_height: s(&m.revision_height),
                },
            },
        };

        Ok(m)
    }
}

/// Transaction fee
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

/// Amino `StdSignDoc`
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: Fee,
    pub memo: String,
    pub msgs: Vec<CosmosMsg>,
    pub sequence: String,
}

impl SignDoc {
    /// Canonical JSON encoding, object keys sorted and no whitespace
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, Error> {
        // serde_json maps are ordered by key, so a round-trip through
        // `Value` sorts nested objects as well
        let v = serde_json::to_value(self).map_err(|_| Error::EncodingFailed)?;
        serde_json::to_vec(&v).map_err(|_| Error::EncodingFailed)
    }

    /// SHA256 digest of the canonical encoding, as signed by wallets
    pub fn digest(&self) -> Result<[u8; 32], Error> {
        let b = self.to_canonical_json()?;
        Ok(Sha256::digest(b).into())
    }
}
