#![allow(unused)]

use std::{str::FromStr, sync::Arc, time::Duration};

use log::{debug, LevelFilter};
use simplelog::SimpleLogger;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use hdwallet::{
    adapter::KeepKeyAdapter, transport::MemoryChannel, Config, Event, EventName, Keyring,
    KeepKeyWallet, Pattern,
};
use hdwallet_sim::{Emulator, Options};

/// Standard test mnemonic
pub const MNEMONIC: &str =
    "alcohol woman abuse must during monitor noble actual mixed trade anger aisle";

/// Emulator device id
pub const DEVICE_ID: &str = "EMULATOR0000";

pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Emulator loaded with the standard mnemonic, confirming all button
/// requests
pub fn loaded() -> Options {
    Options {
        mnemonic: Some(MNEMONIC.to_string()),
        auto_confirm: true,
        ..Default::default()
    }
}

/// Paired emulator instance
pub struct Device {
    pub emulator: Arc<Emulator>,
    pub keyring: Keyring,
    pub wallet: Arc<KeepKeyWallet<MemoryChannel>>,
}

/// Setup an emulator over in-memory channels and pair it with a new keyring
pub async fn setup(opts: Options, config: Config) -> anyhow::Result<Device> {
    setup_logging();

    let emulator = Arc::new(Emulator::new(opts)?);
    let (c, d) = emulator.spawn_memory();

    let keyring = Keyring::new();
    let adapter = KeepKeyAdapter::new(Arc::new(hdwallet::default_registry()), config);

    let wallet = adapter.pair_channel(&keyring, c, Some(d)).await?;

    debug!("paired emulator {}", DEVICE_ID);

    Ok(Device {
        emulator,
        keyring,
        wallet,
    })
}

/// Forward events matching a pattern to a channel
pub fn subscribe(keyring: &Keyring, pattern: Pattern) -> UnboundedReceiver<Event> {
    let (tx, rx) = unbounded_channel();

    keyring.on(pattern, move |e| {
        tx.send(e.clone())?;
        Ok(())
    });

    rx
}

/// Await the next event from a subscription, failing after a timeout
pub async fn next_event(rx: &mut UnboundedReceiver<Event>) -> anyhow::Result<Event> {
    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(e)) => Ok(e),
        Ok(None) => Err(anyhow::anyhow!("event channel closed")),
        Err(_) => Err(anyhow::anyhow!("timeout awaiting event")),
    }
}
