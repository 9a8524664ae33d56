use hdwallet::{
    adapter::{Connect, NativeAdapter, NativeOptions},
    proto::cosmos::{COSMOS, KUJIRA},
    *,
};

mod helpers;
use helpers::*;

async fn eth_sign(w: &NativeWallet, message: &[u8]) -> anyhow::Result<EthSignedMessage> {
    let r = w
        .eth_sign_message(&EthSignMessage {
            address_n: w.eth_get_account_paths(0).remove(0),
            message: message.to_vec(),
        })
        .await?;

    Ok(r)
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_mnemonic_signatures_match() -> anyhow::Result<()> {
    setup_logging();

    let a = NativeWallet::new("native-a", "a");
    a.load_mnemonic(MNEMONIC, "").await?;

    let b = NativeWallet::new("native-b", "b");
    b.load_mnemonic(MNEMONIC, "").await?;

    let sa = eth_sign(&a, b"Hello World").await?;
    assert_eq!(sa, eth_sign(&b, b"Hello World").await?);
    assert_eq!(sa.address, hdwallet_tests::address::ETH_ADDRESS);

    let verified = a
        .eth_verify_message(&EthVerifyMessage {
            address: sa.address.clone(),
            message: b"Hello World".to_vec(),
            signature: sa.signature.clone(),
        })
        .await?;
    assert!(verified);

    // Solana signatures are deterministic too
    let req = SolanaSignTx {
        address_n: a.solana_get_account_paths(0).remove(0),
        raw_tx: b"raw".to_vec(),
    };
    assert_eq!(a.solana_sign_tx(&req).await?, b.solana_sign_tx(&req).await?);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wallet_is_deterministic() -> anyhow::Result<()> {
    setup_logging();

    let a = NativeWallet::new("native-a", "a");
    a.load_test_wallet("Hello World").await;

    let b = NativeWallet::new("native-b", "b");
    b.load_test_wallet("Hello World").await;

    let p = a.eth_get_account_paths(0).remove(0);
    let addr = a.eth_get_address(&GetAddress::new(p.clone(), false)).await?;
    assert_eq!(addr, b.eth_get_address(&GetAddress::new(p.clone(), false)).await?);
    assert_ne!(addr, hdwallet_tests::address::ETH_ADDRESS);

    let c = NativeWallet::new("native-c", "c");
    c.load_test_wallet("Goodbye World").await;
    assert_ne!(addr, c.eth_get_address(&GetAddress::new(p, false)).await?);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wallet_hello_world() -> anyhow::Result<()> {
    setup_logging();

    let w = NativeWallet::new("native-0", "native");
    w.load_test_wallet("Hello World").await;

    let req = BtcSignMessage {
        coin: Coin::Bitcoin,
        address_n: "m/44'/0'/0'/0/0".parse()?,
        script_type: ScriptType::P2pkh,
        message: b"Hello World".to_vec(),
    };

    for _ in 0..2 {
        let s = w.btc_sign_message(&req).await?;

        assert_eq!(s.address, "1AaffwUngLnGyZ9oaqvoBXMMeAmXwqyv5K");
        assert_eq!(
            hex::encode(&s.signature),
            concat!(
                "1f752fb0588fb7fe21c216dd519668fba3fbcd6a18a501ae28aafa0ba714ba474e",
                "63e871703cbe8255e894d6c616d63eeb44119b98bb4e9dd88621cd3ec05d51cc"
            )
        );
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unloaded_wallet_emits_mnemonic_required() -> anyhow::Result<()> {
    setup_logging();

    let k = Keyring::new();
    let mut rx = subscribe(&k, Pattern::any().name(EventName::MnemonicRequired));

    let w = NativeAdapter
        .pair_device(
            &k,
            &NativeOptions {
                device_id: "native-0".to_string(),
                label: "unloaded".to_string(),
                mnemonic: None,
            },
        )
        .await?;

    assert!(!w.features().await?.initialized);

    let p = w.solana_get_account_paths(0).remove(0);
    let r = w.solana_get_address(&GetAddress::new(p.clone(), false)).await;
    assert!(matches!(r, Err(Error::NeedsMnemonic)));

    let e = next_event(&mut rx).await?;
    assert_eq!(e.device_id, "native-0");
    assert_eq!(e.wallet_type, "Native");

    // Loading satisfies subsequent requests
    w.load_device(&LoadDevice {
        mnemonic: MNEMONIC.to_string(),
        ..Default::default()
    })
    .await?;

    assert!(w.features().await?.initialized);
    hdwallet_tests::address::known_vectors(w.as_ref()).await?;

    // Wiping returns the wallet to the unloaded state
    w.wipe().await?;
    assert!(matches!(
        w.solana_get_address(&GetAddress::new(p, false)).await,
        Err(Error::NeedsMnemonic)
    ));
    next_event(&mut rx).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn btc_sign_tx_unsupported() -> anyhow::Result<()> {
    setup_logging();

    let w = NativeWallet::new("native-0", "native");
    w.load_mnemonic(MNEMONIC, "").await?;

    for coin in [Coin::Bitcoin, Coin::Litecoin] {
        let r = w.btc_sign_tx(coin, &[0x01, 0x00, 0x00, 0x00]).await;
        assert!(matches!(
            r,
            Err(Error::Unsupported("bitcoin transaction signing"))
        ));
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn account_path_navigation() -> anyhow::Result<()> {
    setup_logging();

    let w = NativeWallet::new("native-0", "native");

    let p = w.solana_get_account_paths(0).remove(0);
    let n = w.solana_next_account_path(&p).ok_or(anyhow::anyhow!("no next solana path"))?;
    assert_eq!(n, w.solana_get_account_paths(1).remove(0));

    let p = w.eth_get_account_paths(3).remove(0);
    assert_eq!(w.eth_next_account_path(&p), Some(w.eth_get_account_paths(4).remove(0)));

    let p = w.cosmos_get_account_paths(&KUJIRA, 0).remove(0);
    assert_eq!(
        w.cosmos_next_account_path(&KUJIRA, &p).map(|p| p.to_string()),
        Some("m/44'/118'/1'/0/0".to_string())
    );

    // Next paths keep the script type
    for p in w.btc_get_account_paths(Coin::Bitcoin, 0) {
        let n = w.btc_next_account_path(&p).ok_or(anyhow::anyhow!("no next btc path"))?;
        assert_eq!(n.script_type, p.script_type);
        assert_eq!(n.address_n[..2], p.address_n[..2]);
        assert_eq!(n.address_n[2], hardened(1));
    }

    assert!(w.cosmos_supports_network(&KUJIRA, "kaiyo-1"));
    assert!(!w.cosmos_supports_network(&KUJIRA, "harpoon-4"));
    assert!(!w.cosmos_supports_network(&COSMOS, "kaiyo-1"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn native_scenarios() -> anyhow::Result<()> {
    setup_logging();

    let w = NativeWallet::new("native-0", "native");
    w.load_mnemonic(MNEMONIC, "").await?;

    hdwallet_tests::address::test(&w, MNEMONIC, 2).await?;
    hdwallet_tests::message::test(&w, MNEMONIC, "Hello World").await?;
    hdwallet_tests::ethereum::test(&w, MNEMONIC, hdwallet_tests::ethereum::test_tx(100, true))
        .await?;
    hdwallet_tests::solana::test(&w, MNEMONIC, b"solana").await?;

    Ok(())
}
