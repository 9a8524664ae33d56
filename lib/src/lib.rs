// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hardware / software wallet API Library (and CLI)
//!
//! Wallets are paired via an adapter (see [adapter::Connect]) and tracked
//! by a [Keyring], which also dispatches device events (PIN and passphrase
//! requests, button prompts, connection changes) to subscribers.
//!
//! Every wallet implements [HdWallet], chain support is probed at runtime
//! via the capability accessors ([HdWallet::as_bitcoin] etc.), with each
//! chain providing account paths, addresses, and transaction signing.
//!
//! ```no_run
//! use std::sync::Arc;
//! use hdwallet::{adapter::{Connect, KeepKeyAdapter}, transport::TcpOptions, *};
//!
//! # async fn example() -> Result<(), Error> {
//! let keyring = Keyring::new();
//! let adapter = KeepKeyAdapter::new(Arc::new(default_registry()), Config::default());
//!
//! let wallet = adapter.pair_device(&keyring, &TcpOptions::default()).await?;
//!
//! if let Some(eth) = wallet.as_ethereum() {
//!     let p = eth.eth_get_account_paths(0).remove(0);
//!     let a = eth.eth_get_address(&GetAddress::new(p, false)).await?;
//!     println!("address: {a}");
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export `hdwallet-proto` for consumers
pub use hdwallet_proto::{self as proto, default_registry};

/// Re-export `hdwallet-core` for consumers
pub use hdwallet_core::{self, hardened, Bip32Path};

mod error;
pub use error::{Error, TransportError};

mod config;
pub use config::Config;

pub mod keyring;
pub use keyring::{Event, EventName, Keyring, Pattern};

pub mod transport;

pub mod wallet;
pub use wallet::*;

pub mod keepkey;
pub use keepkey::KeepKeyWallet;

pub mod native;
pub use native::NativeWallet;

pub mod adapter;
