// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Adapters pair wallets with a [Keyring]

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use hdwallet_proto::Registry;

use crate::{
    keepkey::{KeepKeyWallet, KEEPKEY_VENDOR},
    keyring::{Emitter, Keyring},
    native::NativeWallet,
    transport::{Channel, Transport},
    wallet::HdWallet,
    Config, Error,
};

#[cfg(feature = "transport_tcp")]
use crate::transport::{TcpChannel, TcpOptions};

/// Connect trait implemented by wallet adapters
#[async_trait]
pub trait Connect {
    /// Options for pairing a device
    type Options: Send + Sync;

    /// Wallet type produced by pairing
    type Wallet: HdWallet + 'static;

    /// Pair a device, registering it with the provided keyring.
    ///
    /// The keyring holds a non-owning reference, the returned wallet
    /// must be retained by the caller for the device to remain available.
    async fn pair_device(
        &self,
        keyring: &Keyring,
        opts: &Self::Options,
    ) -> Result<Arc<Self::Wallet>, Error>;
}

/// Register a wallet, rejecting duplicate device ids
async fn register<W: HdWallet + 'static>(keyring: &Keyring, w: Arc<W>) -> Result<Arc<W>, Error> {
    let id = w.device_id().to_string();

    let d: Arc<dyn HdWallet> = w.clone();
    if !keyring.add(&id, &d) {
        warn!("device {} already paired", id);

        // Drop only this session, the registered wallet stays live
        if let Err(e) = w.disconnect().await {
            debug!("disconnect failed: {}", e);
        }

        return Err(Error::DuplicateDevice(id));
    }

    Ok(w)
}

/// Adapter for KeepKey protocol devices
pub struct KeepKeyAdapter {
    registry: Arc<Registry>,
    config: Config,
}

impl KeepKeyAdapter {
    pub fn new(registry: Arc<Registry>, config: Config) -> Self {
        Self { registry, config }
    }

    fn transport<C: Channel>(&self, channel: C) -> Transport<C> {
        Transport::new(
            channel,
            self.registry.clone(),
            &self.config,
            Emitter::detached("", KEEPKEY_VENDOR),
        )
    }

    /// Pair a device over an existing channel, with optional debug link
    pub async fn pair_channel<C: Channel>(
        &self,
        keyring: &Keyring,
        channel: C,
        debug: Option<C>,
    ) -> Result<Arc<KeepKeyWallet<C>>, Error> {
        let t = self.transport(channel);
        t.connect().await?;

        let d = match debug {
            Some(c) => {
                let d = self.transport(c);
                d.connect().await?;
                Some(d)
            }
            None => None,
        };

        // Device id is only known once features are fetched
        let w = KeepKeyWallet::connect(t, d).await?;

        w.transport()
            .set_emitter(keyring.emitter(w.device_id(), KEEPKEY_VENDOR));
        if let Some(d) = w.debug_transport() {
            d.set_emitter(keyring.emitter(w.device_id(), KEEPKEY_VENDOR));
        }

        register(keyring, Arc::new(w)).await
    }
}

#[cfg(feature = "transport_tcp")]
#[async_trait]
impl Connect for KeepKeyAdapter {
    type Options = TcpOptions;
    type Wallet = KeepKeyWallet<TcpChannel>;

    /// Pair a TCP device, the debug link (if enabled) is expected on the
    /// following port.
    async fn pair_device(
        &self,
        keyring: &Keyring,
        opts: &TcpOptions,
    ) -> Result<Arc<Self::Wallet>, Error> {
        let c = TcpChannel::connect(opts).await?;

        let d = match self.config.debug_link {
            true => {
                let o = TcpOptions {
                    port: opts.port.wrapping_add(1),
                    ..opts.clone()
                };
                Some(TcpChannel::connect(&o).await?)
            }
            false => None,
        };

        self.pair_channel(keyring, c, d).await
    }
}

/// Native wallet pairing options
#[derive(Clone, PartialEq, Debug, Default)]
pub struct NativeOptions {
    pub device_id: String,
    pub label: String,
    /// Mnemonic to load on pairing, the wallet is otherwise left unloaded
    pub mnemonic: Option<String>,
}

/// Adapter for native (software) wallets
#[derive(Clone, Debug, Default)]
pub struct NativeAdapter;

#[async_trait]
impl Connect for NativeAdapter {
    type Options = NativeOptions;
    type Wallet = NativeWallet;

    async fn pair_device(
        &self,
        keyring: &Keyring,
        opts: &NativeOptions,
    ) -> Result<Arc<NativeWallet>, Error> {
        let w = NativeWallet::new(&opts.device_id, &opts.label);

        if let Some(m) = &opts.mnemonic {
            w.load_mnemonic(m, "").await?;
        }

        w.set_emitter(keyring.emitter(&opts.device_id, w.vendor()));

        register(keyring, Arc::new(w)).await
    }
}
