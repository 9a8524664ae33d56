// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device side protocol handling for a single connection

use log::{debug, trace, warn};
use tokio::sync::MutexGuard;

use hdwallet::{
    keepkey::{ETH_DATA_CHUNK, KEEPKEY_VENDOR},
    script_type_from_wire, TransportError,
};
use hdwallet_core::{
    engine::{Error as EngineError, SeedDriver},
    helpers::{
        bitcoin::{self, Coin},
        cosmos::{self, Coin as CosmosCoin, CosmosMsg, Fee, SignDoc},
        ethereum::{self, EthTx},
        solana,
    },
};
use hdwallet_proto::{
    cosmos::{self as pc, CosmosChain, CHAINS},
    messages::{self as pm, ButtonRequestType, FailureType, PinMatrixRequestType},
    solana as ps, Decoded, DynMessage, Envelope, MessageType, ProtocolError,
};

use super::{DeviceState, Emulator};

/// Response type id and message
type Reply = (u32, Box<dyn DynMessage>);

fn reply<M: DynMessage>(type_id: u32, m: M) -> Result<Reply, Abort> {
    Ok((type_id, Box::new(m)))
}

/// Exchange aborted, either reported to the host as a `Failure` or
/// terminating the connection on channel errors
#[derive(Debug)]
enum Abort {
    Failure(pm::Failure),
    Channel(TransportError),
}

fn fail(code: FailureType, message: &str) -> Abort {
    Abort::Failure(pm::Failure::new(code, message))
}

impl From<TransportError> for Abort {
    fn from(e: TransportError) -> Self {
        Abort::Channel(e)
    }
}

impl From<ProtocolError> for Abort {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::UnknownType(_) | ProtocolError::UnexpectedType { .. } => {
                fail(FailureType::UnexpectedMessage, &e.to_string())
            }
            _ => fail(FailureType::SyntaxError, &e.to_string()),
        }
    }
}

impl From<EngineError> for Abort {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NeedsMnemonic => fail(FailureType::NotInitialized, "Device not initialized"),
            _ => fail(FailureType::Other, &e.to_string()),
        }
    }
}

/// Downcast a host message, mapping `Cancel` to a cancelled failure
fn expect<M: 'static>(d: Decoded) -> Result<M, Abort> {
    if d.is::<pm::Cancel>() {
        return Err(fail(FailureType::ActionCancelled, "Action cancelled by user"));
    }
    Ok(d.into_message()?)
}

/// Device connection
pub(crate) struct Conn<'a, C> {
    emu: &'a Emulator,
    channel: C,
}

impl<'a, C: hdwallet::transport::Channel> Conn<'a, C> {
    pub fn new(emu: &'a Emulator, channel: C) -> Self {
        Self { emu, channel }
    }

    /// Serve requests until the channel is closed
    pub async fn run(mut self) -> Result<(), TransportError> {
        loop {
            let r = match self.recv().await {
                Ok(d) => self.handle(d).await,
                Err(e) => Err(e),
            };

            let (type_id, m) = match r {
                Ok(v) => v,
                Err(Abort::Failure(f)) => {
                    debug!("failure: {:?}", f);
                    (MessageType::Failure.id(), Box::new(f) as Box<dyn DynMessage>)
                }
                Err(Abort::Channel(TransportError::ChannelClosed)) => return Ok(()),
                Err(Abort::Channel(e)) => return Err(e),
            };

            match self.send(type_id, m.as_ref()).await {
                Ok(_) => (),
                Err(Abort::Channel(TransportError::ChannelClosed)) => return Ok(()),
                Err(Abort::Channel(e)) => return Err(e),
                Err(Abort::Failure(f)) => warn!("response encoding failed: {:?}", f),
            }
        }
    }

    async fn recv(&mut self) -> Result<Decoded, Abort> {
        let frame = self.channel.read().await?;
        let (e, _) = Envelope::decode_from(&frame)?;

        trace!("rx {} ({} bytes)", e.type_id, e.payload.len());

        Ok(self.emu.registry.decode(&e)?)
    }

    async fn send(&mut self, type_id: u32, m: &dyn DynMessage) -> Result<(), Abort> {
        let e = self.emu.registry.encode(type_id, m)?;

        trace!("tx {} ({} bytes)", e.type_id, e.payload.len());

        self.channel.write(&e.to_frame()?).await?;
        Ok(())
    }

    /// Request button confirmation, awaiting the debug link unless
    /// auto-confirm is enabled
    async fn confirm(&mut self, code: ButtonRequestType) -> Result<(), Abort> {
        let r = pm::ButtonRequest {
            code: Some(code as i32),
            data: None,
        };
        self.send(MessageType::ButtonRequest.id(), &r).await?;

        let _: pm::ButtonAck = expect(self.recv().await?)?;

        if self.emu.opts.auto_confirm {
            return Ok(());
        }

        debug!("awaiting decision for {:?}", code);

        match self.emu.decisions_rx.lock().await.recv().await {
            Some(true) => Ok(()),
            Some(false) => Err(fail(FailureType::ActionCancelled, "Action cancelled by user")),
            None => Err(Abort::Channel(TransportError::ChannelClosed)),
        }
    }

    /// Check the device is initialised and unlocked, requesting PIN and
    /// passphrase where required
    async fn unlock(&mut self, st: &mut DeviceState) -> Result<(), Abort> {
        if !st.engine.is_loaded() {
            return Err(fail(FailureType::NotInitialized, "Device not initialized"));
        }

        if let (Some(pin), false) = (st.pin.clone(), st.pin_cached) {
            let r = pm::PinMatrixRequest {
                r#type: Some(PinMatrixRequestType::Current as i32),
            };
            self.send(MessageType::PinMatrixRequest.id(), &r).await?;

            let a: pm::PinMatrixAck = expect(self.recv().await?)?;
            if a.pin != pin {
                return Err(fail(FailureType::PinInvalid, "PIN invalid"));
            }

            st.pin_cached = true;
        }

        if st.passphrase_protection && !st.passphrase_cached {
            self.send(MessageType::PassphraseRequest.id(), &pm::PassphraseRequest {})
                .await?;

            let a: pm::PassphraseAck = expect(self.recv().await?)?;
            if let Some(m) = &st.mnemonic {
                st.engine
                    .initialize_wallet(SeedDriver::from_mnemonic(m, &a.passphrase)?);
            }

            st.passphrase_cached = true;
        }

        Ok(())
    }

    async fn state(&self) -> MutexGuard<'a, DeviceState> {
        self.emu.state.lock().await
    }

    async fn handle(&mut self, d: Decoded) -> Result<Reply, Abort> {
        let id = d.type_id();

        debug!("handle {} ({})", d.name(), id);

        if let Ok(t) = MessageType::try_from(id) {
            return self.handle_core(t, d).await;
        }

        if let Some(c) = CHAINS
            .iter()
            .find(|c| c.ids.get_address == id || c.ids.sign_tx == id)
        {
            return self.handle_cosmos(c, d).await;
        }

        match id {
            ps::SOLANA_GET_ADDRESS | ps::SOLANA_SIGN_TX => self.handle_solana(d).await,
            _ => Err(fail(FailureType::UnexpectedMessage, "Unexpected message")),
        }
    }

    fn features(&self, st: &DeviceState) -> pm::Features {
        pm::Features {
            vendor: Some(KEEPKEY_VENDOR.to_string()),
            major_version: Some(7),
            minor_version: Some(7),
            patch_version: Some(0),
            bootloader_mode: Some(false),
            device_id: Some(self.emu.opts.device_id.clone()),
            pin_protection: Some(st.pin.is_some()),
            passphrase_protection: Some(st.passphrase_protection),
            label: Some(st.label.clone()),
            initialized: Some(st.engine.is_loaded()),
            pin_cached: Some(st.pin_cached),
            passphrase_cached: Some(st.passphrase_cached),
            model: Some("Emulator".to_string()),
        }
    }

    async fn handle_core(&mut self, t: MessageType, d: Decoded) -> Result<Reply, Abort> {
        use MessageType as T;

        let mut st = self.state().await;

        match t {
            T::Initialize => reply(T::Features.id(), self.features(&st)),
            T::Ping => {
                let m: pm::Ping = d.into_message()?;
                if m.button_protection.unwrap_or_default() {
                    self.confirm(ButtonRequestType::ProtectCall).await?;
                }
                reply(T::Success.id(), pm::Success { message: m.message })
            }
            T::WipeDevice => {
                self.confirm(ButtonRequestType::WipeDevice).await?;

                st.engine.wipe();
                st.mnemonic = None;
                st.pin = None;
                st.pin_cached = false;
                st.passphrase_protection = false;
                st.passphrase_cached = false;

                reply(T::Success.id(), success("Device wiped"))
            }
            T::LoadDevice => {
                let m: pm::LoadDevice = d.into_message()?;
                let mnemonic = m.mnemonic.unwrap_or_default();

                let drv = SeedDriver::from_mnemonic(&mnemonic, "")
                    .map_err(|_| fail(FailureType::SyntaxError, "Invalid mnemonic"))?;

                st.engine.initialize_wallet(drv);
                st.mnemonic = Some(mnemonic.into());
                st.pin = m.pin.filter(|p| !p.is_empty());
                st.pin_cached = false;
                st.passphrase_protection = m.passphrase_protection.unwrap_or_default();
                st.passphrase_cached = false;
                if let Some(l) = m.label {
                    st.label = l;
                }

                reply(T::Success.id(), success("Device loaded"))
            }
            T::ClearSession => {
                st.pin_cached = false;
                st.passphrase_cached = false;

                reply(T::Success.id(), success("Session cleared"))
            }
            T::Cancel => Err(fail(FailureType::ActionCancelled, "Action cancelled by user")),
            T::GetPublicKey => {
                let m: pm::GetPublicKey = d.into_message()?;
                self.unlock(&mut st).await?;

                let x = st.engine.xpub(&m.address_n)?;
                if m.show_display.unwrap_or_default() {
                    self.confirm(ButtonRequestType::Address).await?;
                }

                reply(
                    T::PublicKey.id(),
                    pm::PublicKey {
                        node: Some(pm::HdNode {
                            depth: x.depth as u32,
                            fingerprint: x.parent_fingerprint,
                            child_num: x.child_number,
                            chain_code: x.chain_code.to_vec(),
                            public_key: Some(x.public_key.to_vec()),
                        }),
                        xpub: Some(x.xpub),
                    },
                )
            }
            T::GetAddress => {
                let m: pm::GetAddress = d.into_message()?;
                let (coin, script_type) = btc_params(m.coin_name.as_deref(), m.script_type)?;
                self.unlock(&mut st).await?;

                let pk = st.engine.public_key(&m.address_n)?;
                let address = bitcoin::address(coin, script_type, &pk)?;

                if m.show_display.unwrap_or_default() {
                    self.confirm(ButtonRequestType::Address).await?;
                }

                reply(
                    T::Address.id(),
                    pm::Address {
                        address: Some(address),
                    },
                )
            }
            T::SignMessage => {
                let m: pm::SignMessage = d.into_message()?;
                let (coin, script_type) = btc_params(m.coin_name.as_deref(), m.script_type)?;
                self.unlock(&mut st).await?;

                self.confirm(ButtonRequestType::SignMessage).await?;

                let pk = st.engine.public_key(&m.address_n)?;
                let digest = bitcoin::message_digest(coin, &m.message);
                let sig = st.engine.sign_prehash(&m.address_n, &digest)?;

                reply(
                    T::MessageSignature.id(),
                    pm::MessageSignature {
                        address: Some(bitcoin::address(coin, script_type, &pk)?),
                        signature: Some(bitcoin::encode_signature(&sig, script_type).to_vec()),
                    },
                )
            }
            T::EthereumGetAddress => {
                let m: pm::EthereumGetAddress = d.into_message()?;
                self.unlock(&mut st).await?;

                let a = ethereum::address(&st.engine.public_key_uncompressed(&m.address_n)?);

                if m.show_display.unwrap_or_default() {
                    self.confirm(ButtonRequestType::Address).await?;
                }

                reply(
                    T::EthereumAddress.id(),
                    pm::EthereumAddress {
                        address: Some(a.to_vec()),
                        address_str: Some(ethereum::to_checksum(&a)),
                    },
                )
            }
            T::EthereumSignTx => {
                let m: pm::EthereumSignTx = d.into_message()?;
                self.unlock(&mut st).await?;

                let tx = self.eth_stream_tx(m.clone()).await?;

                self.confirm(ButtonRequestType::SignTx).await?;

                let sig = st.engine.sign_prehash(&m.address_n, &tx.signing_digest())?;
                let v = u32::try_from(tx.signature_v(sig.recovery_id))
                    .map_err(|_| fail(FailureType::SyntaxError, "Chain id out of range"))?;

                reply(
                    T::EthereumTxRequest.id(),
                    pm::EthereumTxRequest {
                        data_length: None,
                        signature_v: Some(v),
                        signature_r: Some(sig.signature[..32].to_vec()),
                        signature_s: Some(sig.signature[32..].to_vec()),
                    },
                )
            }
            T::EthereumSignMessage => {
                let m: pm::EthereumSignMessage = d.into_message()?;
                self.unlock(&mut st).await?;

                self.confirm(ButtonRequestType::SignMessage).await?;

                let a = ethereum::address(&st.engine.public_key_uncompressed(&m.address_n)?);
                let sig = st
                    .engine
                    .sign_prehash(&m.address_n, &ethereum::personal_digest(&m.message))?;

                reply(
                    T::EthereumMessageSignature.id(),
                    pm::EthereumMessageSignature {
                        address: Some(a.to_vec()),
                        signature: Some(ethereum::encode_message_signature(&sig).to_vec()),
                    },
                )
            }
            _ => Err(fail(FailureType::UnexpectedMessage, "Unexpected message")),
        }
    }

    /// Collect streamed transaction data, requesting chunks of at most
    /// [ETH_DATA_CHUNK] bytes
    async fn eth_stream_tx(&mut self, m: pm::EthereumSignTx) -> Result<EthTx, Abort> {
        let total = m.data_length.unwrap_or_default() as usize;
        let mut data = m.data_initial_chunk.unwrap_or_default();

        if data.len() > total {
            return Err(fail(FailureType::SyntaxError, "Initial chunk exceeds data length"));
        }

        while data.len() < total {
            let n = (total - data.len()).min(ETH_DATA_CHUNK);

            let r = pm::EthereumTxRequest {
                data_length: Some(n as u32),
                ..Default::default()
            };
            self.send(MessageType::EthereumTxRequest.id(), &r).await?;

            let a: pm::EthereumTxAck = expect(self.recv().await?)?;
            let chunk = a.data_chunk.unwrap_or_default();
            if chunk.is_empty() || chunk.len() > n {
                return Err(fail(FailureType::SyntaxError, "Invalid data chunk"));
            }

            data.extend_from_slice(&chunk);
        }

        let chain_id = m
            .chain_id
            .ok_or_else(|| fail(FailureType::SyntaxError, "Missing chain id"))?;

        let (gas_price, max_fee_per_gas, max_priority_fee_per_gas) = match m.tx_type {
            Some(2) => (
                None,
                m.max_fee_per_gas.unwrap_or_default(),
                m.max_priority_fee_per_gas.unwrap_or_default(),
            ),
            _ => (Some(m.gas_price.unwrap_or_default()), vec![], vec![]),
        };

        Ok(EthTx {
            chain_id: chain_id as u64,
            nonce: m.nonce.unwrap_or_default(),
            gas_price,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            gas_limit: m.gas_limit.unwrap_or_default(),
            to: m.to.unwrap_or_default(),
            value: m.value.unwrap_or_default(),
            data,
        })
    }

    async fn handle_cosmos(&mut self, chain: &CosmosChain, d: Decoded) -> Result<Reply, Abort> {
        let mut st = self.state().await;

        if d.type_id() == chain.ids.get_address {
            let m: pc::CosmosGetAddress = d.into_message()?;
            self.unlock(&mut st).await?;

            let address = cosmos::address(chain.hrp, &st.engine.public_key(&m.address_n)?)?;

            if m.show_display.unwrap_or_default() {
                self.confirm(ButtonRequestType::Address).await?;
            }

            return reply(
                chain.ids.address,
                pc::CosmosAddress {
                    address: Some(address),
                },
            );
        }

        let h: pc::CosmosSignTx = d.into_message()?;
        self.unlock(&mut st).await?;

        let n = h.msg_count.unwrap_or_default();
        if n == 0 {
            return Err(fail(FailureType::SyntaxError, "No messages"));
        }

        let mut msgs = Vec::with_capacity(n as usize);
        for _ in 0..n {
            self.send(chain.ids.msg_request, &pc::CosmosMsgRequest {})
                .await?;

            let a: pc::CosmosMsgAck = expect(self.recv().await?)?;
            msgs.push(CosmosMsg::from_ack(&a)?);
        }

        // Fees are always paid in the chain denomination
        let doc = SignDoc {
            account_number: h.account_number.unwrap_or_default(),
            chain_id: h.chain_id.unwrap_or_default(),
            fee: Fee {
                amount: vec![CosmosCoin::new(h.fee_amount.unwrap_or_default(), chain.denom)],
                gas: h.gas.unwrap_or_default(),
            },
            memo: h.memo.unwrap_or_default(),
            msgs,
            sequence: h.sequence.unwrap_or_default(),
        };

        self.confirm(ButtonRequestType::SignTx).await?;

        let pk = st.engine.public_key(&h.address_n)?;
        let sig = st.engine.sign_prehash(&h.address_n, &doc.digest()?)?;

        reply(
            chain.ids.signed_tx,
            pc::CosmosSignedTx {
                public_key: Some(pk.to_vec()),
                signature: Some(sig.signature.to_vec()),
            },
        )
    }

    async fn handle_solana(&mut self, d: Decoded) -> Result<Reply, Abort> {
        let mut st = self.state().await;

        if d.type_id() == ps::SOLANA_GET_ADDRESS {
            let m: ps::SolanaGetAddress = d.into_message()?;
            check_hardened(&m.address_n)?;
            self.unlock(&mut st).await?;

            let address = solana::address(&st.engine.ed25519_public_key(&m.address_n)?);

            if m.show_display.unwrap_or_default() {
                self.confirm(ButtonRequestType::Address).await?;
            }

            return reply(
                ps::SOLANA_ADDRESS,
                ps::SolanaAddress {
                    address: Some(address),
                },
            );
        }

        let m: ps::SolanaSignTx = d.into_message()?;
        check_hardened(&m.address_n)?;
        self.unlock(&mut st).await?;

        self.confirm(ButtonRequestType::SignTx).await?;

        let sig = st
            .engine
            .sign_ed25519(&m.address_n, &m.raw_tx.unwrap_or_default())?;

        reply(
            ps::SOLANA_SIGNED_TX,
            ps::SolanaSignedTx {
                signature: Some(sig.to_vec()),
            },
        )
    }
}

fn success(message: &str) -> pm::Success {
    pm::Success {
        message: Some(message.to_string()),
    }
}

fn btc_params(
    coin_name: Option<&str>,
    script_type: Option<i32>,
) -> Result<(Coin, bitcoin::ScriptType), Abort> {
    let coin = coin_name
        .unwrap_or("Bitcoin")
        .parse::<Coin>()
        .map_err(|_| fail(FailureType::SyntaxError, "Unsupported coin"))?;
    let script_type = script_type_from_wire(script_type)
        .ok_or_else(|| fail(FailureType::SyntaxError, "Unsupported script type"))?;

    Ok((coin, script_type))
}

fn check_hardened(path: &[u32]) -> Result<(), Abort> {
    match path.iter().all(|i| i & hdwallet_core::HARDENED != 0) {
        true => Ok(()),
        false => Err(fail(FailureType::SyntaxError, "Path must be fully hardened")),
    }
}
