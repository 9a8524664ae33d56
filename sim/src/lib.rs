// Copyright (c) 2022-2023 The MobileCoin Foundation

//! KeepKey protocol device emulator
//!
//! The [Emulator] serves the device side of the wire protocol over any
//! [Channel], backed by the same key isolation engine as native wallets
//! so device and software wallets produce identical results for the same
//! mnemonic.
//!
//! A second (debug link) channel accepts `DebugLinkDecision` messages to
//! confirm or reject button requests, unless `auto_confirm` is set.
//!
//! Emulators may be attached to in-memory channels for tests via
//! [Emulator::spawn_memory], or served over TCP via [Emulator::listen]
//! (the debug link is served on the following port).

use std::{net::SocketAddr, sync::Arc};

use log::{debug, info, warn};
use tokio::{
    net::TcpListener,
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        Mutex,
    },
    task::JoinHandle,
};
use zeroize::Zeroizing;

use hdwallet::{
    transport::{Channel, MemoryChannel, TcpChannel},
    TransportError,
};
use hdwallet_core::engine::{Engine, Error as EngineError, SeedDriver};
use hdwallet_proto::{default_registry, messages::DebugLinkDecision, Envelope, Registry};

mod device;

/// Emulator options
#[derive(Clone, PartialEq, Debug, clap::Parser)]
pub struct Options {
    /// Mnemonic to load on start, the device is otherwise uninitialised
    #[clap(long, env = "HDWALLET_MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Device PIN
    #[clap(long)]
    pub pin: Option<String>,

    /// Request a passphrase prior to key operations
    #[clap(long)]
    pub passphrase_protection: bool,

    /// Device label
    #[clap(long, default_value = "emulator")]
    pub label: String,

    /// Device identifier
    #[clap(long, default_value = "EMULATOR0000")]
    pub device_id: String,

    /// Confirm button requests without awaiting the debug link
    #[clap(long)]
    pub auto_confirm: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mnemonic: None,
            pin: None,
            passphrase_protection: false,
            label: "emulator".to_string(),
            device_id: "EMULATOR0000".to_string(),
            auto_confirm: false,
        }
    }
}

/// Mutable device state, shared between connections
struct DeviceState {
    engine: Engine<SeedDriver>,
    mnemonic: Option<Zeroizing<String>>,
    pin: Option<String>,
    pin_cached: bool,
    passphrase_protection: bool,
    passphrase_cached: bool,
    label: String,
}

/// KeepKey protocol device emulator
pub struct Emulator {
    opts: Options,
    registry: Registry,
    state: Mutex<DeviceState>,
    decisions_tx: UnboundedSender<bool>,
    decisions_rx: Mutex<UnboundedReceiver<bool>>,
}

impl Emulator {
    /// Create a new emulator instance
    pub fn new(opts: Options) -> Result<Self, EngineError> {
        let mut engine = Engine::new();
        if let Some(m) = &opts.mnemonic {
            engine.initialize_wallet(SeedDriver::from_mnemonic(m, "")?);
        }

        let (decisions_tx, decisions_rx) = unbounded_channel();

        Ok(Self {
            registry: default_registry(),
            state: Mutex::new(DeviceState {
                engine,
                mnemonic: opts.mnemonic.clone().map(Zeroizing::new),
                pin: opts.pin.clone(),
                pin_cached: false,
                passphrase_protection: opts.passphrase_protection,
                passphrase_cached: false,
                label: opts.label.clone(),
            }),
            opts,
            decisions_tx,
            decisions_rx: Mutex::new(decisions_rx),
        })
    }

    /// Fetch emulator options
    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Serve the device protocol over a channel, returning once the
    /// channel is closed.
    pub async fn serve<C: Channel>(&self, channel: C) -> Result<(), TransportError> {
        device::Conn::new(self, channel).run().await
    }

    /// Serve the debug link over a channel
    pub async fn serve_debug<C: Channel>(&self, mut channel: C) -> Result<(), TransportError> {
        loop {
            let frame = match channel.read().await {
                Ok(v) => v,
                Err(TransportError::ChannelClosed) => return Ok(()),
                Err(e) => return Err(e),
            };

            let d = match Envelope::decode_from(&frame).and_then(|(e, _)| self.registry.decode(&e)) {
                Ok(d) => d,
                Err(e) => {
                    warn!("debug link decode failed: {}", e);
                    continue;
                }
            };

            match d.into_message::<DebugLinkDecision>() {
                Ok(m) => {
                    debug!("debug link decision: {}", m.yes_no);
                    // Receiver is owned by this emulator
                    let _ = self.decisions_tx.send(m.yes_no);
                }
                Err(e) => warn!("unsupported debug link message: {}", e),
            }
        }
    }

    /// Spawn device and debug link tasks over in-memory channels,
    /// returning the host ends `(device, debug)`.
    pub fn spawn_memory(self: &Arc<Self>) -> (MemoryChannel, MemoryChannel) {
        let (host, dev) = MemoryChannel::pair();
        let (debug_host, debug_dev) = MemoryChannel::pair();

        let e = self.clone();
        tokio::spawn(async move {
            if let Err(err) = e.serve(dev).await {
                warn!("emulator channel error: {}", err);
            }
        });

        let e = self.clone();
        tokio::spawn(async move {
            if let Err(err) = e.serve_debug(debug_dev).await {
                warn!("emulator debug link error: {}", err);
            }
        });

        (host, debug_host)
    }

    /// Bind TCP listeners for the device (`addr`) and debug link
    /// (`addr.port + 1`), spawning a task to accept connections.
    pub async fn listen(
        self: &Arc<Self>,
        addr: SocketAddr,
    ) -> Result<JoinHandle<Result<(), std::io::Error>>, std::io::Error> {
        let l = TcpListener::bind(addr).await?;
        let d = TcpListener::bind(SocketAddr::new(addr.ip(), addr.port() + 1)).await?;

        info!(
            "emulator {} listening on {} (debug link: {})",
            self.opts.device_id,
            l.local_addr()?,
            d.local_addr()?
        );

        Ok(tokio::spawn(self.clone().accept(l, d)))
    }

    async fn accept(self: Arc<Self>, l: TcpListener, d: TcpListener) -> Result<(), std::io::Error> {
        loop {
            tokio::select! {
                r = l.accept() => {
                    let (s, a) = r?;
                    debug!("device connection from {}", a);
                    s.set_nodelay(true)?;

                    let e = self.clone();
                    tokio::spawn(async move {
                        if let Err(err) = e.serve(TcpChannel::from(s)).await {
                            warn!("emulator channel error: {}", err);
                        }
                    });
                }
                r = d.accept() => {
                    let (s, a) = r?;
                    debug!("debug link connection from {}", a);

                    let e = self.clone();
                    tokio::spawn(async move {
                        if let Err(err) = e.serve_debug(TcpChannel::from(s)).await {
                            warn!("emulator debug link error: {}", err);
                        }
                    });
                }
            }
        }
    }
}
