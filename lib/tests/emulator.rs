use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use serde_json::json;

use hdwallet::{
    adapter::{Connect, KeepKeyAdapter},
    proto::{
        cosmos::{self as pc, CHAINS, COSMOS, KUJIRA, OSMOSIS},
        messages::{self as pm, FailureType},
        RegistryBuilder,
    },
    transport::TcpOptions,
    *,
};
use hdwallet_sim::{Emulator, Options};
use hdwallet_tests::{address, cosmos, ethereum, message, solana};

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn known_vectors() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    address::known_vectors(d.wallet.as_ref()).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn addresses_match_native() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    address::test(d.wallet.as_ref(), MNEMONIC, 2).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn messages_match_native() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    message::test(d.wallet.as_ref(), MNEMONIC, "Hello World").await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn eth_legacy_tx() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    ethereum::test(d.wallet.as_ref(), MNEMONIC, ethereum::test_tx(0, false)).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn eth_eip1559_tx_chunked() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    // Calldata spans multiple device chunks
    ethereum::test(d.wallet.as_ref(), MNEMONIC, ethereum::test_tx(2500, true)).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cosmos_chains() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    for chain in CHAINS {
        cosmos::test(d.wallet.as_ref(), MNEMONIC, chain).await?;
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn solana_tx() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    solana::test(d.wallet.as_ref(), MNEMONIC, b"solana test transaction").await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cosmos_rejected_before_device() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;
    let mut taps = subscribe(&d.keyring, Pattern::any().name(EventName::Message));

    let p = d.wallet.cosmos_get_account_paths(&KUJIRA, 0).remove(0);
    let from = d
        .wallet
        .cosmos_get_address(&KUJIRA, &GetAddress::new(p.clone(), false))
        .await?;
    while taps.try_recv().is_ok() {}

    // Fee in a foreign denomination
    let mut req = cosmos::sign_request(
        &KUJIRA,
        p.clone(),
        vec![cosmos::msg_send(&from, &from, 1000, KUJIRA.denom)],
    );
    req.fee.amount = vec![CosmosCoin::new(3000, "notukuji")];

    let r = d.wallet.cosmos_sign_tx(&KUJIRA, &req).await;
    assert!(matches!(r, Err(Error::Validation(_))));

    // Unsupported messages abort the whole transaction
    let req = cosmos::sign_request(
        &KUJIRA,
        p,
        vec![
            cosmos::msg_send(&from, &from, 1000, KUJIRA.denom),
            json!({ "type": "cosmos-sdk/MsgVote", "value": { "voter": from } }),
        ],
    );

    let r = d.wallet.cosmos_sign_tx(&KUJIRA, &req).await;
    assert!(matches!(r, Err(Error::Validation(_))));

    assert!(taps.try_recv().is_err());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn btc_sign_tx_unsupported() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;
    let mut taps = subscribe(&d.keyring, Pattern::any().name(EventName::Message));

    let r = d.wallet.btc_sign_tx(Coin::Bitcoin, &[0x02, 0x00, 0x00, 0x00]).await;
    assert!(matches!(
        r,
        Err(Error::Unsupported("bitcoin transaction signing"))
    ));

    // Reported without touching the device
    assert!(taps.try_recv().is_err());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn solana_show_display_prompts() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;
    let mut buttons = subscribe(&d.keyring, Pattern::any().name(EventName::ButtonRequest));

    let p = d.wallet.solana_get_account_paths(0).remove(0);

    d.wallet
        .solana_get_address(&GetAddress::new(p.clone(), false))
        .await?;
    assert!(buttons.try_recv().is_err());

    d.wallet
        .solana_get_address(&GetAddress::new(p, true))
        .await?;
    let e = next_event(&mut buttons).await?;
    assert_eq!(e.device_id, DEVICE_ID);

    // Non-hardened paths never reach the device
    let r = d
        .wallet
        .solana_get_address(&GetAddress::new(Bip32Path::from([hardened(44), 501]), false))
        .await;
    assert!(matches!(r, Err(Error::Validation(_))));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn debug_link_decisions() -> anyhow::Result<()> {
    let opts = Options {
        auto_confirm: false,
        ..loaded()
    };
    let d = setup(opts, Config::default()).await?;
    let mut buttons = subscribe(&d.keyring, Pattern::any().name(EventName::ButtonRequest));

    let ping = |message: &str| {
        let w = d.wallet.clone();
        let p = Ping {
            message: message.to_string(),
            button: true,
        };
        tokio::spawn(async move { w.ping(&p).await })
    };

    let dl = d.wallet.as_debug_link().ok_or(Error::Unsupported("debug link"))?;

    let h = ping("approved");
    next_event(&mut buttons).await?;
    dl.press_yes().await?;
    assert_eq!(h.await??, "approved");

    let h = ping("rejected");
    next_event(&mut buttons).await?;
    dl.press_no().await?;
    let r = h.await?;
    assert!(matches!(&r, Err(e) if e.is_failure(FailureType::ActionCancelled)));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn wipe_and_reload() -> anyhow::Result<()> {
    let d = setup(loaded(), Config::default()).await?;

    d.wallet.wipe().await?;
    assert!(!d.wallet.features().await?.initialized);

    let p = d.wallet.eth_get_account_paths(0).remove(0);
    let r = d.wallet.eth_get_address(&GetAddress::new(p, false)).await;
    assert!(matches!(&r, Err(e) if e.is_failure(FailureType::NotInitialized)));

    d.wallet
        .load_device(&LoadDevice {
            mnemonic: MNEMONIC.to_string(),
            label: Some("reloaded".to_string()),
            ..Default::default()
        })
        .await?;

    let f = d.wallet.features().await?;
    assert!(f.initialized);
    assert_eq!(f.label, "reloaded");

    address::known_vectors(d.wallet.as_ref()).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn capabilities_follow_registry() -> anyhow::Result<()> {
    setup_logging();

    let mut b = RegistryBuilder::new();
    pm::register(&mut b);
    pc::register(&mut b, &COSMOS);

    let emulator = Arc::new(Emulator::new(loaded())?);
    let (c, _) = emulator.spawn_memory();

    let keyring = Keyring::new();
    let a = KeepKeyAdapter::new(Arc::new(b.build()), Config::default());
    let w = a.pair_channel(&keyring, c, None).await?;

    assert!(supports_bitcoin(w.as_ref()));
    assert!(supports_ethereum(w.as_ref()));
    assert!(supports_cosmos_sdk(w.as_ref(), &COSMOS));
    assert!(!supports_cosmos_sdk(w.as_ref(), &OSMOSIS));
    assert!(!supports_solana(w.as_ref()));
    assert!(!supports_debug_link(w.as_ref()));

    // Registered chains remain usable
    let p = w.cosmos_get_account_paths(&COSMOS, 0).remove(0);
    let a = w.cosmos_get_address(&COSMOS, &GetAddress::new(p, false)).await?;
    assert_eq!(a, address::COSMOS_ADDRESS);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tcp_emulator() -> anyhow::Result<()> {
    setup_logging();

    let port = portpicker::pick_unused_port().ok_or(anyhow::anyhow!("no free port"))?;
    let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    let emulator = Arc::new(Emulator::new(loaded())?);
    let listener = emulator.listen(SocketAddr::new(addr, port)).await?;

    let keyring = Keyring::new();
    let a = KeepKeyAdapter::new(
        Arc::new(default_registry()),
        Config {
            debug_link: true,
            ..Default::default()
        },
    );

    let w = a.pair_device(&keyring, &TcpOptions { addr, port }).await?;
    assert_eq!(w.device_id(), DEVICE_ID);
    assert!(supports_debug_link(w.as_ref()));

    address::known_vectors(w.as_ref()).await?;

    keyring.remove_all().await;
    listener.abort();

    Ok(())
}
