// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet for devices speaking the KeepKey wire protocol
//!
//! This provides [HdWallet] and chain capabilities over a [Transport],
//! and is generic over [Channel] types to support different underlying
//! links (TCP emulators, in-memory test channels).

use std::sync::RwLock;

use async_trait::async_trait;
use log::debug;

use hdwallet_core::helpers::ethereum;
use hdwallet_proto::{
    cosmos::{self as pc, CosmosChain},
    messages as pm,
    solana as ps, MessageType,
};

use crate::{
    transport::{CallOptions, Channel, Transport},
    wallet::*,
    Error,
};

/// Wallet type for KeepKey protocol devices
pub const KEEPKEY_VENDOR: &str = "KeepKey";

/// Maximum data chunk streamed per `EthereumTxAck`
pub const ETH_DATA_CHUNK: usize = 1024;

/// KeepKey protocol wallet over a [Transport].
pub struct KeepKeyWallet<C: Channel> {
    transport: Transport<C>,
    /// Optional debug link transport (emulators only)
    debug: Option<Transport<C>>,
    device_id: String,
    features: RwLock<Option<Features>>,
}

impl<C: Channel> KeepKeyWallet<C> {
    /// Initialise a device over connected transports, fetching features
    /// to resolve the device id.
    pub async fn connect(transport: Transport<C>, debug: Option<Transport<C>>) -> Result<Self, Error> {
        let f = fetch_features(&transport).await?;

        debug!("connected {} device {}", f.model, f.device_id);

        Ok(Self {
            transport,
            debug,
            device_id: f.device_id.clone(),
            features: RwLock::new(Some(f)),
        })
    }

    /// Fetch the underlying transport
    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    /// Fetch the debug link transport, if attached
    pub fn debug_transport(&self) -> Option<&Transport<C>> {
        self.debug.as_ref()
    }

    fn cache(&self, f: Option<Features>) {
        *self.features.write().unwrap_or_else(|e| e.into_inner()) = f;
    }

    fn cached(&self) -> Option<Features> {
        self.features
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn success(&self, t: MessageType, m: &dyn hdwallet_proto::DynMessage) -> Result<String, Error> {
        let r: pm::Success = self
            .transport
            .request(t.id(), m, CallOptions::default())
            .await?;
        Ok(r.message.unwrap_or_default())
    }

    async fn decision(&self, yes_no: bool) -> Result<(), Error> {
        let t = self
            .debug
            .as_ref()
            .ok_or(Error::Unsupported("debug link"))?;

        debug!("debug link decision: {}", yes_no);

        t.post(
            MessageType::DebugLinkDecision.id(),
            &pm::DebugLinkDecision { yes_no },
        )
        .await
    }
}

async fn fetch_features<C: Channel>(t: &Transport<C>) -> Result<Features, Error> {
    let f: pm::Features = t
        .request(
            MessageType::Initialize.id(),
            &pm::Initialize {},
            CallOptions::default(),
        )
        .await?;

    Ok(Features {
        vendor: f.vendor.unwrap_or_else(|| KEEPKEY_VENDOR.to_string()),
        model: f.model.unwrap_or_default(),
        device_id: f.device_id.ok_or(Error::MissingField("device_id"))?,
        firmware_version: format!(
            "{}.{}.{}",
            f.major_version.unwrap_or_default(),
            f.minor_version.unwrap_or_default(),
            f.patch_version.unwrap_or_default()
        ),
        label: f.label.unwrap_or_default(),
        initialized: f.initialized.unwrap_or_default(),
        pin_protection: f.pin_protection.unwrap_or_default(),
        passphrase_protection: f.passphrase_protection.unwrap_or_default(),
    })
}

#[async_trait]
impl<C: Channel> HdWallet for KeepKeyWallet<C> {
    fn vendor(&self) -> &str {
        KEEPKEY_VENDOR
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn initialize(&self) -> Result<Features, Error> {
        let f = fetch_features(&self.transport).await?;
        self.cache(Some(f.clone()));
        Ok(f)
    }

    async fn features(&self) -> Result<Features, Error> {
        match self.cached() {
            Some(f) => Ok(f),
            None => self.initialize().await,
        }
    }

    async fn ping(&self, req: &Ping) -> Result<String, Error> {
        let m = pm::Ping {
            message: Some(req.message.clone()),
            button_protection: Some(req.button),
            ..Default::default()
        };

        self.success(MessageType::Ping, &m).await
    }

    async fn wipe(&self) -> Result<(), Error> {
        self.success(MessageType::WipeDevice, &pm::WipeDevice {})
            .await?;
        self.cache(None);
        Ok(())
    }

    async fn load_device(&self, req: &LoadDevice) -> Result<(), Error> {
        let m = pm::LoadDevice {
            mnemonic: Some(req.mnemonic.clone()),
            pin: req.pin.clone(),
            passphrase_protection: Some(req.passphrase_protection),
            label: req.label.clone(),
            skip_checksum: Some(req.skip_checksum),
        };

        self.success(MessageType::LoadDevice, &m).await?;
        self.cache(None);
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), Error> {
        self.success(MessageType::ClearSession, &pm::ClearSession {})
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        if let Some(d) = &self.debug {
            d.disconnect().await?;
        }
        self.transport.disconnect().await
    }

    async fn send_pin(&self, pin: &str) -> Result<(), Error> {
        self.transport.send_pin(pin)
    }

    async fn send_passphrase(&self, passphrase: &str) -> Result<(), Error> {
        self.transport.send_passphrase(passphrase)
    }

    async fn cancel(&self) -> Result<(), Error> {
        self.transport.cancel().await
    }

    async fn get_public_keys(&self, req: &[GetPublicKey]) -> Result<Vec<PublicKey>, Error> {
        let mut keys = Vec::with_capacity(req.len());

        for r in req {
            let m = pm::GetPublicKey {
                address_n: r.address_n.to_vec(),
                ecdsa_curve_name: None,
                show_display: Some(r.show_display),
                coin_name: r.coin_name.clone(),
            };

            let resp: pm::PublicKey = self
                .transport
                .request(MessageType::GetPublicKey.id(), &m, CallOptions::default())
                .await?;

            keys.push(PublicKey {
                xpub: resp.xpub.ok_or(Error::MissingField("xpub"))?,
            });
        }

        Ok(keys)
    }

    fn as_bitcoin(&self) -> Option<&dyn BitcoinWallet> {
        Some(self)
    }

    fn as_ethereum(&self) -> Option<&dyn EthereumWallet> {
        Some(self)
    }

    fn as_cosmos_sdk(&self, chain: &CosmosChain) -> Option<&dyn CosmosWallet> {
        // Chains are available where their messages are registered
        match self.transport.registry().contains(chain.ids.sign_tx) {
            true => Some(self),
            false => None,
        }
    }

    fn as_solana(&self) -> Option<&dyn SolanaWallet> {
        match self.transport.registry().contains(ps::SOLANA_SIGN_TX) {
            true => Some(self),
            false => None,
        }
    }

    fn as_debug_link(&self) -> Option<&dyn DebugLinkWallet> {
        match self.debug.is_some() {
            true => Some(self),
            false => None,
        }
    }
}

#[async_trait]
impl<C: Channel> BitcoinWallet for KeepKeyWallet<C> {
    async fn btc_get_address(&self, req: &BtcGetAddress) -> Result<String, Error> {
        let m = pm::GetAddress {
            address_n: req.address_n.to_vec(),
            coin_name: Some(req.coin.to_string()),
            show_display: Some(req.show_display),
            script_type: Some(script_type_to_wire(req.script_type) as i32),
        };

        let r: pm::Address = self
            .transport
            .request(MessageType::GetAddress.id(), &m, CallOptions::default())
            .await?;

        r.address.ok_or(Error::MissingField("address"))
    }

    async fn btc_sign_message(&self, req: &BtcSignMessage) -> Result<BtcSignedMessage, Error> {
        let m = pm::SignMessage {
            address_n: req.address_n.to_vec(),
            message: req.message.clone(),
            coin_name: Some(req.coin.to_string()),
            script_type: Some(script_type_to_wire(req.script_type) as i32),
        };

        let r: pm::MessageSignature = self
            .transport
            .request(MessageType::SignMessage.id(), &m, CallOptions::default())
            .await?;

        Ok(BtcSignedMessage {
            address: r.address.ok_or(Error::MissingField("address"))?,
            signature: r.signature.ok_or(Error::MissingField("signature"))?,
        })
    }
}

#[async_trait]
impl<C: Channel> EthereumWallet for KeepKeyWallet<C> {
    async fn eth_get_address(&self, req: &GetAddress) -> Result<String, Error> {
        let m = pm::EthereumGetAddress {
            address_n: req.address_n.to_vec(),
            show_display: Some(req.show_display),
        };

        let r: pm::EthereumAddress = self
            .transport
            .request(
                MessageType::EthereumGetAddress.id(),
                &m,
                CallOptions::default(),
            )
            .await?;

        // Normalise to EIP-55 whichever form the device returns
        let a = match (r.address_str, r.address) {
            (Some(s), _) => ethereum::parse_address(&s)?,
            (None, Some(b)) => b
                .as_slice()
                .try_into()
                .map_err(|_| Error::MissingField("address"))?,
            (None, None) => return Err(Error::MissingField("address")),
        };

        Ok(ethereum::to_checksum(&a))
    }

    async fn eth_sign_tx(&self, req: &EthSignTx) -> Result<EthSignedTx, Error> {
        let tx = &req.tx;

        let chain_id = u32::try_from(tx.chain_id)
            .map_err(|_| Error::Validation(format!("unsupported chain id {}", tx.chain_id)))?;
        let data_length = u32::try_from(tx.data.len())
            .map_err(|_| Error::Validation("transaction data too long".to_string()))?;

        let (initial, mut rest) = tx.data.split_at(tx.data.len().min(ETH_DATA_CHUNK));

        let eip1559 = tx.is_eip1559();
        let m = pm::EthereumSignTx {
            address_n: req.address_n.to_vec(),
            nonce: Some(tx.nonce.clone()),
            gas_price: tx.gas_price.clone(),
            gas_limit: Some(tx.gas_limit.clone()),
            to: Some(tx.to.clone()),
            value: Some(tx.value.clone()),
            data_initial_chunk: Some(initial.to_vec()),
            data_length: Some(data_length),
            chain_id: Some(chain_id),
            tx_type: eip1559.then_some(2),
            max_fee_per_gas: eip1559.then(|| tx.max_fee_per_gas.clone()),
            max_priority_fee_per_gas: eip1559.then(|| tx.max_priority_fee_per_gas.clone()),
        };

        debug!(
            "signing ethereum tx (chain: {}, data: {} bytes)",
            chain_id, data_length
        );

        // Data streaming must not interleave with other calls
        let r = self
            .transport
            .lock_during(|mut s| async move {
                let opts = CallOptions::default();

                let mut r: pm::EthereumTxRequest = s
                    .request(MessageType::EthereumSignTx.id(), &m, opts)
                    .await?;

                while let Some(n) = r.data_length.filter(|n| *n > 0) {
                    if rest.is_empty() {
                        return Err(Error::Validation(
                            "device requested data beyond transaction length".to_string(),
                        ));
                    }

                    let (chunk, tail) = rest.split_at((n as usize).min(rest.len()));
                    rest = tail;

                    let ack = pm::EthereumTxAck {
                        data_chunk: Some(chunk.to_vec()),
                    };
                    r = s
                        .request(MessageType::EthereumTxAck.id(), &ack, opts)
                        .await?;
                }

                Ok(r)
            })
            .await?;

        let v = r.signature_v.ok_or(Error::MissingField("signature_v"))?;
        let sig_r = r.signature_r.ok_or(Error::MissingField("signature_r"))?;
        let sig_s = r.signature_s.ok_or(Error::MissingField("signature_s"))?;

        Ok(EthSignedTx::new(tx, v as u64, sig_r, sig_s))
    }

    async fn eth_sign_message(&self, req: &EthSignMessage) -> Result<EthSignedMessage, Error> {
        let m = pm::EthereumSignMessage {
            address_n: req.address_n.to_vec(),
            message: req.message.clone(),
        };

        let r: pm::EthereumMessageSignature = self
            .transport
            .request(
                MessageType::EthereumSignMessage.id(),
                &m,
                CallOptions::default(),
            )
            .await?;

        let a: [u8; 20] = r
            .address
            .as_deref()
            .and_then(|a| a.try_into().ok())
            .ok_or(Error::MissingField("address"))?;

        Ok(EthSignedMessage {
            address: ethereum::to_checksum(&a),
            signature: r.signature.ok_or(Error::MissingField("signature"))?,
        })
    }
}

#[async_trait]
impl<C: Channel> CosmosWallet for KeepKeyWallet<C> {
    async fn cosmos_get_address(&self, chain: &CosmosChain, req: &GetAddress) -> Result<String, Error> {
        let m = pc::CosmosGetAddress {
            address_n: req.address_n.to_vec(),
            show_display: Some(req.show_display),
        };

        let r: pc::CosmosAddress = self
            .transport
            .request(chain.ids.get_address, &m, CallOptions::default())
            .await?;

        r.address.ok_or(Error::MissingField("address"))
    }

    async fn cosmos_sign_tx(
        &self,
        chain: &CosmosChain,
        req: &CosmosSignTx,
    ) -> Result<CosmosSignedTx, Error> {
        // Reject the whole transaction prior to any device interaction
        let msgs = validate_cosmos_tx(chain, req)?;
        let acks = msgs
            .iter()
            .map(|m| m.to_ack())
            .collect::<Result<Vec<_>, _>>()?;

        let fee = req.fee.amount.first().ok_or(Error::MissingField("fee"))?;
        let header = pc::CosmosSignTx {
            address_n: req.address_n.to_vec(),
            account_number: Some(req.account_number.clone()),
            chain_id: Some(req.chain_id.clone()),
            fee_amount: Some(fee.amount.clone()),
            gas: Some(req.fee.gas.clone()),
            memo: Some(req.memo.clone()),
            sequence: Some(req.sequence.clone()),
            msg_count: Some(acks.len() as u32),
        };

        debug!("signing {} tx ({} messages)", chain.name, acks.len());

        let ids = chain.ids;
        let signed = self
            .transport
            .lock_during(|mut s| async move {
                let opts = CallOptions::default();

                let (last, init) = acks.split_last().ok_or(Error::MissingField("msgs"))?;

                let _: pc::CosmosMsgRequest = s.request(ids.sign_tx, &header, opts).await?;

                for a in init {
                    let _: pc::CosmosMsgRequest = s.request(ids.msg_ack, a, opts).await?;
                }

                let r: pc::CosmosSignedTx = s.request(ids.msg_ack, last, opts).await?;
                Ok(r)
            })
            .await?;

        CosmosSignedTx::new(
            req,
            &msgs,
            signed.public_key.ok_or(Error::MissingField("public_key"))?,
            signed.signature.ok_or(Error::MissingField("signature"))?,
        )
    }
}

#[async_trait]
impl<C: Channel> SolanaWallet for KeepKeyWallet<C> {
    async fn solana_get_address(&self, req: &GetAddress) -> Result<String, Error> {
        check_solana_path(&req.address_n)?;

        let m = ps::SolanaGetAddress {
            address_n: req.address_n.to_vec(),
            coin_name: Some("Solana".to_string()),
            show_display: Some(req.show_display),
        };

        let r: ps::SolanaAddress = self
            .transport
            .request(ps::SOLANA_GET_ADDRESS, &m, CallOptions::default())
            .await?;

        r.address.ok_or(Error::MissingField("address"))
    }

    async fn solana_sign_tx(&self, req: &SolanaSignTx) -> Result<SolanaSignedTx, Error> {
        check_solana_path(&req.address_n)?;

        let m = ps::SolanaSignTx {
            address_n: req.address_n.to_vec(),
            coin_name: Some("Solana".to_string()),
            raw_tx: Some(req.raw_tx.clone()),
        };

        let r: ps::SolanaSignedTx = self
            .transport
            .request(ps::SOLANA_SIGN_TX, &m, CallOptions::default())
            .await?;

        Ok(SolanaSignedTx {
            signature: r.signature.ok_or(Error::MissingField("signature"))?,
        })
    }
}

#[async_trait]
impl<C: Channel> DebugLinkWallet for KeepKeyWallet<C> {
    async fn press_yes(&self) -> Result<(), Error> {
        self.decision(true).await
    }

    async fn press_no(&self) -> Result<(), Error> {
        self.decision(false).await
    }
}
