// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Cosmos-SDK family messages
//!
//! Cosmos, Osmosis, Kujira and Thorchain share message shapes but each
//! chain is assigned its own block of type identifiers, see [CosmosChain].
//! A sign transaction exchange proceeds as:
//!
//! 1. Host sends [CosmosSignTx] with fee, gas, sequence and message count
//! 2. Device replies [CosmosMsgRequest] for each message, host answers
//!    with a [CosmosMsgAck]
//! 3. Device replies [CosmosSignedTx] once all messages are acknowledged

use crate::RegistryBuilder;

/// Per-chain message type identifiers
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CosmosIds {
    pub get_address: u32,
    pub address: u32,
    pub sign_tx: u32,
    pub msg_request: u32,
    pub msg_ack: u32,
    pub signed_tx: u32,
}

impl CosmosIds {
    /// Consecutive identifiers starting at `base`
    pub const fn from_base(base: u32) -> Self {
        Self {
            get_address: base,
            address: base + 1,
            sign_tx: base + 2,
            msg_request: base + 3,
            msg_ack: base + 4,
            signed_tx: base + 5,
        }
    }
}

/// Cosmos-SDK chain descriptor
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CosmosChain {
    /// Chain name, used as message name prefix
    pub name: &'static str,
    /// SLIP-0044 coin type
    pub slip44: u32,
    /// Native fee / transfer denomination
    pub denom: &'static str,
    /// Bech32 address prefix
    pub hrp: &'static str,
    /// Default network chain id
    pub chain_id: &'static str,
    /// Staking messages (delegate, undelegate, redelegate, rewards) supported
    pub staking: bool,
    /// IBC transfers supported
    pub ibc: bool,
    /// Message identifiers
    pub ids: CosmosIds,
}

pub const COSMOS: CosmosChain = CosmosChain {
    name: "Cosmos",
    slip44: 118,
    denom: "uatom",
    hrp: "cosmos",
    chain_id: "cosmoshub-4",
    staking: true,
    ibc: true,
    ids: CosmosIds::from_base(900),
};

pub const OSMOSIS: CosmosChain = CosmosChain {
    name: "Osmosis",
    slip44: 118,
    denom: "uosmo",
    hrp: "osmo",
    chain_id: "osmosis-1",
    staking: true,
    ibc: true,
    ids: CosmosIds::from_base(1100),
};

pub const KUJIRA: CosmosChain = CosmosChain {
    name: "Kujira",
    slip44: 118,
    denom: "ukuji",
    hrp: "kujira",
    chain_id: "kaiyo-1",
    staking: true,
    ibc: true,
    ids: CosmosIds::from_base(1400),
};

pub const THORCHAIN: CosmosChain = CosmosChain {
    name: "Thorchain",
    slip44: 931,
    denom: "rune",
    hrp: "thor",
    chain_id: "thorchain-mainnet-v1",
    staking: false,
    ibc: false,
    ids: CosmosIds::from_base(500),
};

/// Supported cosmos-sdk chains
pub const CHAINS: &[CosmosChain] = &[COSMOS, OSMOSIS, KUJIRA, THORCHAIN];

impl CosmosChain {
    /// Resolve a chain by (case-insensitive) name
    pub fn by_name(name: &str) -> Option<&'static CosmosChain> {
        CHAINS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosGetAddress {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bool, optional, tag = "2")]
    pub show_display: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosAddress {
    #[prost(string, optional, tag = "1")]
    pub address: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosSignTx {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(string, optional, tag = "2")]
    pub account_number: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub chain_id: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub fee_amount: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub gas: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub memo: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub sequence: Option<String>,
    #[prost(uint32, optional, tag = "8")]
    pub msg_count: Option<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosMsgRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosMsgSend {
    #[prost(string, optional, tag = "1")]
    pub from_address: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub to_address: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub amount: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub denom: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosMsgDelegate {
    #[prost(string, optional, tag = "1")]
    pub delegator_address: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub validator_address: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub amount: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub denom: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosMsgRedelegate {
    #[prost(string, optional, tag = "1")]
    pub delegator_address: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub validator_src_address: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub validator_dst_address: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub amount: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub denom: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosMsgRewards {
    #[prost(string, optional, tag = "1")]
    pub delegator_address: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub validator_address: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub amount: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub denom: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosMsgIbcTransfer {
    #[prost(string, optional, tag = "1")]
    pub source_port: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub source_channel: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub denom: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub amount: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub sender: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub receiver: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub revision_number: Option<String>,
    #[prost(string, optional, tag = "8")]
    pub revision_height: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosMsgAck {
    #[prost(oneof = "cosmos_msg_ack::Msg", tags = "1, 2, 3, 4, 5, 6")]
    pub msg: Option<cosmos_msg_ack::Msg>,
}

pub mod cosmos_msg_ack {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Msg {
        #[prost(message, tag = "1")]
        Send(super::CosmosMsgSend),
        #[prost(message, tag = "2")]
        Delegate(super::CosmosMsgDelegate),
        #[prost(message, tag = "3")]
        Undelegate(super::CosmosMsgDelegate),
        #[prost(message, tag = "4")]
        Redelegate(super::CosmosMsgRedelegate),
        #[prost(message, tag = "5")]
        Rewards(super::CosmosMsgRewards),
        #[prost(message, tag = "6")]
        IbcTransfer(super::CosmosMsgIbcTransfer),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CosmosSignedTx {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub public_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature: Option<Vec<u8>>,
}

/// Register message types for the provided chain
pub fn register(b: &mut RegistryBuilder, chain: &CosmosChain) {
    let (n, ids) = (chain.name, &chain.ids);

    b.register::<CosmosGetAddress>(ids.get_address, format!("{n}GetAddress"))
        .register::<CosmosAddress>(ids.address, format!("{n}Address"))
        .register::<CosmosSignTx>(ids.sign_tx, format!("{n}SignTx"))
        .register::<CosmosMsgRequest>(ids.msg_request, format!("{n}MsgRequest"))
        .register::<CosmosMsgAck>(ids.msg_ack, format!("{n}MsgAck"))
        .register::<CosmosSignedTx>(ids.signed_tx, format!("{n}SignedTx"));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{test::encode_decode_message, RegistryBuilder};

    #[test]
    fn chain_ids_do_not_overlap() {
        let mut seen = std::collections::HashSet::new();
        for c in CHAINS {
            let i = c.ids;
            for id in [
                i.get_address,
                i.address,
                i.sign_tx,
                i.msg_request,
                i.msg_ack,
                i.signed_tx,
            ] {
                assert!(seen.insert(id), "duplicate id {id} for {}", c.name);
            }
        }
    }

    #[test]
    fn kujira_registration() {
        let mut b = RegistryBuilder::new();
        register(&mut b, &KUJIRA);
        let r = b.build();

        assert_eq!(r.name(KUJIRA.ids.sign_tx), Some("KujiraSignTx"));
        assert!(!r.contains(COSMOS.ids.sign_tx));

        let m = CosmosSignTx {
            address_n: vec![0x8000_002c, 0x8000_0076, 0x8000_0000, 0, 0],
            account_number: Some("16359".to_string()),
            chain_id: Some("kaiyo-1".to_string()),
            fee_amount: Some("3000".to_string()),
            gas: Some("200000".to_string()),
            memo: Some("".to_string()),
            sequence: Some("0".to_string()),
            msg_count: Some(1),
        };
        encode_decode_message(&r, KUJIRA.ids.sign_tx, &m);

        let a = CosmosMsgAck {
            msg: Some(cosmos_msg_ack::Msg::Send(CosmosMsgSend {
                from_address: Some("kujira1from".to_string()),
                to_address: Some("kujira1to".to_string()),
                amount: Some("10000".to_string()),
                denom: Some("ukuji".to_string()),
            })),
        };
        encode_decode_message(&r, KUJIRA.ids.msg_ack, &a);
    }

    #[test]
    fn chain_lookup() {
        assert_eq!(CosmosChain::by_name("kujira"), Some(&KUJIRA));
        assert_eq!(CosmosChain::by_name("THORCHAIN").map(|c| c.slip44), Some(931));
        assert!(CosmosChain::by_name("terra").is_none());
    }
}
