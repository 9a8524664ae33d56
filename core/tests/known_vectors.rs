// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Engine derivation and signing against known addresses for the standard
//! test mnemonic

use sha2::{Digest, Sha256};

use hdwallet_core::{
    engine::{Engine, Error, SeedDriver, State},
    helpers::{bitcoin, cosmos, ethereum, solana},
    Bip32Path,
};

mod helpers;
use helpers::*;

#[test]
fn bitcoin_address() -> anyhow::Result<()> {
    setup();

    let e = engine();
    let p: Bip32Path = "m/44'/0'/0'/0/0".parse()?;

    let pk = e.public_key(&p)?;
    let a = bitcoin::address(bitcoin::Coin::Bitcoin, bitcoin::ScriptType::P2pkh, &pk)?;
    assert_eq!(a, "1FH6ehAd5ZFXCM1cLGzHxK1s4dGdq1JusM");

    Ok(())
}

#[test]
fn bitcoin_sign_verify_message() -> anyhow::Result<()> {
    setup();

    let e = engine();
    let p: Bip32Path = "m/44'/0'/0'/0/0".parse()?;
    let pk = e.public_key(&p)?;
    let a = bitcoin::address(bitcoin::Coin::Bitcoin, bitcoin::ScriptType::P2pkh, &pk)?;

    let digest = bitcoin::message_digest(bitcoin::Coin::Bitcoin, b"Hello World");
    let sig = e.sign_prehash(&p, &digest)?;
    let encoded = bitcoin::encode_signature(&sig, bitcoin::ScriptType::P2pkh);

    assert!(bitcoin::verify_message(
        bitcoin::Coin::Bitcoin,
        &a,
        b"Hello World",
        &encoded
    )?);
    assert!(!bitcoin::verify_message(
        bitcoin::Coin::Bitcoin,
        &a,
        b"Goodbye World",
        &encoded
    )?);

    Ok(())
}

#[test]
fn ethereum_address() -> anyhow::Result<()> {
    setup();

    let e = engine();
    let p: Bip32Path = "m/44'/60'/0'/0/0".parse()?;

    let pk = e.public_key_uncompressed(&p)?;
    let a = ethereum::to_checksum(&ethereum::address(&pk));
    assert_eq!(
        a.to_lowercase(),
        "0x3f2329C9ADFbcCd9A84f52c906E936A42dA18CB8".to_lowercase()
    );

    // Personal message round trip
    let sig = e.sign_prehash(&p, &ethereum::personal_digest(b"Hello World"))?;
    let encoded = ethereum::encode_message_signature(&sig);
    assert_eq!(
        ethereum::recover_message_address(b"Hello World", &encoded)?,
        ethereum::address(&pk)
    );

    Ok(())
}

#[test]
fn cosmos_address() -> anyhow::Result<()> {
    setup();

    let e = engine();
    let p: Bip32Path = "m/44'/118'/0'/0/0".parse()?;

    let pk = e.public_key(&p)?;
    assert_eq!(
        cosmos::address("cosmos", &pk)?,
        "cosmos15cenya0tr7nm3tz2wn3h3zwkht2rxrq7q7h3dj"
    );

    Ok(())
}

#[test]
fn solana_address_is_stable() -> anyhow::Result<()> {
    setup();

    let (a, b) = (engine(), engine());
    let p = solana::account_path(0);

    let ka = a.ed25519_public_key(&p)?;
    assert_eq!(ka, b.ed25519_public_key(&p)?);

    let addr = solana::address(&ka);
    assert_eq!(solana::parse_address(&addr)?, ka);

    Ok(())
}

#[test]
fn dummy_hello_world() -> anyhow::Result<()> {
    setup();

    let p: Bip32Path = "m/44'/0'/0'/0/0".parse()?;
    let digest: [u8; 32] = Sha256::digest(b"Hello World").into();

    let mut signatures = vec![];
    for _ in 0..2 {
        let mut e = Engine::new();
        e.initialize_wallet(SeedDriver::dummy(TEST_XPUBS));

        signatures.push(e.sign_prehash(&p, &digest)?);
    }

    assert_eq!(signatures[0], signatures[1]);

    // A different dummy seed produces a different key
    let mut other = Engine::new();
    other.initialize_wallet(SeedDriver::dummy("some other seed"));
    assert_ne!(other.sign_prehash(&p, &digest)?, signatures[0]);

    Ok(())
}

#[test]
fn unloaded_engine_needs_mnemonic() -> anyhow::Result<()> {
    setup();

    let e = Engine::<SeedDriver>::new();
    let p: Bip32Path = "m/44'/0'/0'/0/0".parse()?;

    assert_eq!(e.public_key(&p), Err(Error::NeedsMnemonic));
    assert_eq!(e.sign_prehash(&p, &[0u8; 32]), Err(Error::NeedsMnemonic));
    assert_eq!(e.state(), State::Unloaded);

    Ok(())
}
