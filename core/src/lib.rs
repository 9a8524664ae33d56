// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hardware wallet core
//!
//! This provides a common key isolation [Engine][engine::Engine] supporting
//! derivation and signing for software wallets and device emulators, along
//! with chain [helpers] for address formats, message digests and transaction
//! serialisation shared between host and device implementations.
//!
//! ## Key isolation
//!
//! The [Engine][engine::Engine] holds a [Driver][engine::Driver] providing
//! BIP-0032 (secp256k1) and SLIP-0010 (ed25519) derivation from a master
//! seed. Private keys are derived per operation and dropped (zeroized)
//! once the operation completes, only public keys and signatures leave
//! the engine.
//!
//! Engines start [Unloaded][engine::State::Unloaded], any operation prior
//! to [initialize_wallet][engine::Engine::initialize_wallet] returns
//! [Error::NeedsMnemonic][engine::Error::NeedsMnemonic].
//!
//! ## Derivation paths
//!
//! Paths are expressed as [Bip32Path] values, with hardened indices
//! having the top bit set (see [HARDENED]).

pub use hdwallet_proto::{self as proto};

mod path;
pub use path::{hardened, Bip32Path, HARDENED};

pub mod engine;

pub mod helpers;
