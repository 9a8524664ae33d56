#![allow(unused)]

use std::str::FromStr;

use log::LevelFilter;

use hdwallet_core::engine::{Engine, SeedDriver};

/// Standard test mnemonic
pub const MNEMONIC: &str =
    "alcohol woman abuse must during monitor noble actual mixed trade anger aisle";

/// Dummy seed string, a list of known test xpubs
pub const TEST_XPUBS: &str = "xpub6D1weXBcFAo8CqBbpP4TbH5sxQH8ZkqC5pDEvJ95rNNBZC9zrKmZP2fXMuve7ZRBe18pWQQsGg68jkq24mZchHwYENd8cCiSb71u3KD4AFH xpub6CjUD98iPwWtuRVMGqKX5sgnXWBC8AK5F8sHW9HfnySPtWcVC6VYLUn3C5EhaJ8P1NvxsUj1UDhmCdTy2R8gy2XsFpSsmGSbW9Bv93K2BRc";

pub fn setup() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = simplelog::SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Engine loaded with the standard test mnemonic
pub fn engine() -> Engine<SeedDriver> {
    let mut e = Engine::new();
    e.initialize_wallet(SeedDriver::from_mnemonic(MNEMONIC, "").unwrap());
    e
}
