// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use hdwallet_core::helpers::bitcoin::{Coin, ScriptType};
use hdwallet_core::{hardened, helpers::bitcoin, Bip32Path};
use hdwallet_proto::messages::InputScriptType;

use crate::Error;

/// Bitcoin-family account path
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BtcAccountPath {
    pub coin: Coin,
    pub script_type: ScriptType,
    /// Account level path, `m/purpose'/coin'/account'`
    pub address_n: Bip32Path,
}

impl AsRef<[u32]> for BtcAccountPath {
    fn as_ref(&self) -> &[u32] {
        &self.address_n
    }
}

impl BtcAccountPath {
    /// Receive address path for an index within this account
    pub fn address(&self, index: u32) -> Bip32Path {
        self.address_n.child(0).child(index)
    }
}

/// Account paths for each script type supported by a coin
pub fn btc_account_paths(coin: Coin, account: u32) -> Vec<BtcAccountPath> {
    let mut scripts = vec![(44, ScriptType::P2pkh)];
    if coin.bech32_hrp().is_some() {
        scripts.push((49, ScriptType::P2shP2wpkh));
        scripts.push((84, ScriptType::P2wpkh));
    }

    scripts
        .into_iter()
        .map(|(purpose, script_type)| BtcAccountPath {
            coin,
            script_type,
            address_n: Bip32Path::from([
                hardened(purpose),
                hardened(coin.slip44()),
                hardened(account),
            ]),
        })
        .collect()
}

/// Map a script type to the device protocol representation
pub fn script_type_to_wire(s: ScriptType) -> InputScriptType {
    match s {
        ScriptType::P2pkh => InputScriptType::SpendAddress,
        ScriptType::P2shP2wpkh => InputScriptType::SpendP2shWitness,
        ScriptType::P2wpkh => InputScriptType::SpendWitness,
    }
}

/// Map a device protocol script type, defaulting to p2pkh where unset
pub fn script_type_from_wire(s: Option<i32>) -> Option<ScriptType> {
    match s.map(InputScriptType::from_i32) {
        None | Some(Some(InputScriptType::SpendAddress)) => Some(ScriptType::P2pkh),
        Some(Some(InputScriptType::SpendP2shWitness)) => Some(ScriptType::P2shP2wpkh),
        Some(Some(InputScriptType::SpendWitness)) => Some(ScriptType::P2wpkh),
        _ => None,
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BtcGetAddress {
    pub coin: Coin,
    pub address_n: Bip32Path,
    #[serde(default)]
    pub script_type: ScriptType,
    #[serde(default)]
    pub show_display: bool,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BtcSignMessage {
    pub coin: Coin,
    pub address_n: Bip32Path,
    #[serde(default)]
    pub script_type: ScriptType,
    pub message: Vec<u8>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BtcSignedMessage {
    pub address: String,
    /// 65-byte recoverable signature with script type header
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BtcVerifyMessage {
    pub coin: Coin,
    pub address: String,
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Bitcoin-family (UTXO) capability
#[async_trait]
pub trait BitcoinWallet: Send + Sync {
    fn btc_get_account_paths(&self, coin: Coin, account: u32) -> Vec<BtcAccountPath> {
        btc_account_paths(coin, account)
    }

    /// Same script type in the following account
    fn btc_next_account_path(&self, path: &BtcAccountPath) -> Option<BtcAccountPath> {
        super::next_account_path(path, |a| self.btc_get_account_paths(path.coin, a))
    }

    async fn btc_get_address(&self, req: &BtcGetAddress) -> Result<String, Error>;

    async fn btc_sign_message(&self, req: &BtcSignMessage) -> Result<BtcSignedMessage, Error>;

    /// Verify a signed message, computed locally
    async fn btc_verify_message(&self, req: &BtcVerifyMessage) -> Result<bool, Error> {
        Ok(bitcoin::verify_message(
            req.coin,
            &req.address,
            &req.message,
            &req.signature,
        )?)
    }

    /// Sign a serialised unsigned transaction.
    ///
    /// Not provided by any wallet in this library, reported before any
    /// device interaction.
    async fn btc_sign_tx(&self, _coin: Coin, _unsigned_tx: &[u8]) -> Result<Vec<u8>, Error> {
        Err(Error::Unsupported("bitcoin transaction signing"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn account_paths() {
        let p = btc_account_paths(Coin::Bitcoin, 1);
        assert_eq!(p.len(), 3);
        assert_eq!(p[0].address_n.to_string(), "m/44'/0'/1'");
        assert_eq!(p[2].script_type, ScriptType::P2wpkh);
        assert_eq!(p[2].address(5).to_string(), "m/84'/0'/1'/0/5");

        // No segwit for dogecoin
        let p = btc_account_paths(Coin::Dogecoin, 0);
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].address_n.to_string(), "m/44'/3'/0'");
    }

    #[test]
    fn wire_script_types() {
        for s in [ScriptType::P2pkh, ScriptType::P2shP2wpkh, ScriptType::P2wpkh] {
            assert_eq!(
                script_type_from_wire(Some(script_type_to_wire(s) as i32)),
                Some(s)
            );
        }
        assert_eq!(script_type_from_wire(None), Some(ScriptType::P2pkh));
        assert_eq!(
            script_type_from_wire(Some(InputScriptType::SpendMultisig as i32)),
            None
        );
    }
}
