// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software wallet backed by the key isolation [Engine]
//!
//! The wallet starts unloaded, any key operation prior to loading a
//! mnemonic emits `MNEMONIC_REQUIRED` and fails with
//! [Error::NeedsMnemonic]. PIN, passphrase and cancel requests are
//! accepted and ignored as there is no interactive user on this path.

use std::sync::RwLock;

use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use hdwallet_core::{
    engine::{Engine, Error as EngineError, SeedDriver},
    helpers::{bitcoin, cosmos, ethereum, solana},
};
use hdwallet_proto::cosmos::CosmosChain;

use crate::{
    keyring::{Emitter, EventName},
    wallet::*,
    Error,
};

/// Wallet type for native wallets
pub const NATIVE_VENDOR: &str = "Native";

pub struct NativeWallet {
    device_id: String,
    label: String,
    engine: Mutex<Engine<SeedDriver>>,
    emitter: RwLock<Emitter>,
}

impl NativeWallet {
    /// Create a new, unloaded, native wallet
    pub fn new(device_id: &str, label: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            label: label.to_string(),
            engine: Mutex::new(Engine::new()),
            emitter: RwLock::new(Emitter::detached(device_id, NATIVE_VENDOR)),
        }
    }

    /// Attach an event emitter (see [Keyring::emitter][crate::Keyring::emitter])
    pub fn set_emitter(&self, emitter: Emitter) {
        *self.emitter.write().unwrap_or_else(|e| e.into_inner()) = emitter;
    }

    /// Load a BIP-0039 mnemonic with optional passphrase
    pub async fn load_mnemonic(&self, mnemonic: &str, passphrase: &str) -> Result<(), Error> {
        let drv = SeedDriver::from_mnemonic(mnemonic, passphrase)?;
        self.engine.lock().await.initialize_wallet(drv);

        debug!("native wallet {} loaded", self.device_id);

        Ok(())
    }

    /// Load a deterministic test wallet from an arbitrary seed string.
    ///
    /// Never use this for real funds.
    pub async fn load_test_wallet(&self, seed: &str) {
        self.engine
            .lock()
            .await
            .initialize_wallet(SeedDriver::dummy(seed));

        debug!("native wallet {} loaded (test seed)", self.device_id);
    }

    /// Check whether key material is loaded
    pub async fn is_loaded(&self) -> bool {
        self.engine.lock().await.is_loaded()
    }

    /// Run an operation against the loaded engine
    async fn with_engine<R>(
        &self,
        f: impl FnOnce(&Engine<SeedDriver>) -> Result<R, EngineError>,
    ) -> Result<R, Error> {
        let e = self.engine.lock().await;

        if !e.is_loaded() {
            debug!("native wallet {} not loaded", self.device_id);

            self.emitter
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .emit(EventName::MnemonicRequired, serde_json::Value::Null);

            return Err(Error::NeedsMnemonic);
        }

        Ok(f(&*e)?)
    }
}

#[async_trait]
impl HdWallet for NativeWallet {
    fn vendor(&self) -> &str {
        NATIVE_VENDOR
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn initialize(&self) -> Result<Features, Error> {
        self.features().await
    }

    async fn features(&self) -> Result<Features, Error> {
        Ok(Features {
            vendor: NATIVE_VENDOR.to_string(),
            model: NATIVE_VENDOR.to_string(),
            device_id: self.device_id.clone(),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            label: self.label.clone(),
            initialized: self.is_loaded().await,
            pin_protection: false,
            passphrase_protection: false,
        })
    }

    async fn ping(&self, req: &Ping) -> Result<String, Error> {
        Ok(req.message.clone())
    }

    async fn wipe(&self) -> Result<(), Error> {
        self.engine.lock().await.wipe();
        Ok(())
    }

    async fn load_device(&self, req: &LoadDevice) -> Result<(), Error> {
        self.load_mnemonic(&req.mnemonic, "").await
    }

    async fn clear_session(&self) -> Result<(), Error> {
        self.engine.lock().await.wipe();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn send_pin(&self, _pin: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn send_passphrase(&self, _passphrase: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn cancel(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn get_public_keys(&self, req: &[GetPublicKey]) -> Result<Vec<PublicKey>, Error> {
        self.with_engine(|e| {
            req.iter()
                .map(|r| {
                    e.xpub(&r.address_n)
                        .map(|x| PublicKey { xpub: x.xpub })
                })
                .collect()
        })
        .await
    }

    fn as_bitcoin(&self) -> Option<&dyn BitcoinWallet> {
        Some(self)
    }

    fn as_ethereum(&self) -> Option<&dyn EthereumWallet> {
        Some(self)
    }

    fn as_cosmos_sdk(&self, _chain: &CosmosChain) -> Option<&dyn CosmosWallet> {
        Some(self)
    }

    fn as_solana(&self) -> Option<&dyn SolanaWallet> {
        Some(self)
    }
}

#[async_trait]
impl BitcoinWallet for NativeWallet {
    async fn btc_get_address(&self, req: &BtcGetAddress) -> Result<String, Error> {
        self.with_engine(|e| {
            let pk = e.public_key(&req.address_n)?;
            bitcoin::address(req.coin, req.script_type, &pk)
        })
        .await
    }

    async fn btc_sign_message(&self, req: &BtcSignMessage) -> Result<BtcSignedMessage, Error> {
        self.with_engine(|e| {
            let pk = e.public_key(&req.address_n)?;
            let address = bitcoin::address(req.coin, req.script_type, &pk)?;

            let digest = bitcoin::message_digest(req.coin, &req.message);
            let sig = e.sign_prehash(&req.address_n, &digest)?;

            Ok(BtcSignedMessage {
                address,
                signature: bitcoin::encode_signature(&sig, req.script_type).to_vec(),
            })
        })
        .await
    }
}

fn eth_address(e: &Engine<SeedDriver>, path: &[u32]) -> Result<String, EngineError> {
    let pk = e.public_key_uncompressed(path)?;
    Ok(ethereum::to_checksum(&ethereum::address(&pk)))
}

#[async_trait]
impl EthereumWallet for NativeWallet {
    async fn eth_get_address(&self, req: &GetAddress) -> Result<String, Error> {
        self.with_engine(|e| eth_address(e, &req.address_n)).await
    }

    async fn eth_sign_tx(&self, req: &EthSignTx) -> Result<EthSignedTx, Error> {
        let sig = self
            .with_engine(|e| e.sign_prehash(&req.address_n, &req.tx.signing_digest()))
            .await?;

        let (r, s) = sig.signature.split_at(32);

        Ok(EthSignedTx::new(
            &req.tx,
            req.tx.signature_v(sig.recovery_id),
            r.to_vec(),
            s.to_vec(),
        ))
    }

    async fn eth_sign_message(&self, req: &EthSignMessage) -> Result<EthSignedMessage, Error> {
        self.with_engine(|e| {
            let sig = e.sign_prehash(&req.address_n, &ethereum::personal_digest(&req.message))?;

            Ok(EthSignedMessage {
                address: eth_address(e, &req.address_n)?,
                signature: ethereum::encode_message_signature(&sig).to_vec(),
            })
        })
        .await
    }
}

#[async_trait]
impl CosmosWallet for NativeWallet {
    async fn cosmos_get_address(&self, chain: &CosmosChain, req: &GetAddress) -> Result<String, Error> {
        self.with_engine(|e| cosmos::address(chain.hrp, &e.public_key(&req.address_n)?))
            .await
    }

    async fn cosmos_sign_tx(
        &self,
        chain: &CosmosChain,
        req: &CosmosSignTx,
    ) -> Result<CosmosSignedTx, Error> {
        let msgs = validate_cosmos_tx(chain, req)?;
        let doc = cosmos_sign_doc(req, msgs.clone());

        let (public_key, sig) = self
            .with_engine(|e| {
                let digest = doc.digest()?;
                Ok((
                    e.public_key(&req.address_n)?,
                    e.sign_prehash(&req.address_n, &digest)?,
                ))
            })
            .await?;

        CosmosSignedTx::new(req, &msgs, public_key.to_vec(), sig.signature.to_vec())
    }
}

#[async_trait]
impl SolanaWallet for NativeWallet {
    async fn solana_get_address(&self, req: &GetAddress) -> Result<String, Error> {
        check_solana_path(&req.address_n)?;

        self.with_engine(|e| Ok(solana::address(&e.ed25519_public_key(&req.address_n)?)))
            .await
    }

    async fn solana_sign_tx(&self, req: &SolanaSignTx) -> Result<SolanaSignedTx, Error> {
        check_solana_path(&req.address_n)?;

        let signature = self
            .with_engine(|e| e.sign_ed25519(&req.address_n, &req.raw_tx))
            .await?;

        Ok(SolanaSignedTx {
            signature: signature.to_vec(),
        })
    }
}
