// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address derivation tests

use log::{debug, info};

use hdwallet::{proto::cosmos::CHAINS, *};

use crate::{pair, reference};

/// Known addresses for [TEST_MNEMONIC][crate::TEST_MNEMONIC]
pub const BTC_ADDRESS: &str = "1FH6ehAd5ZFXCM1cLGzHxK1s4dGdq1JusM";
pub const ETH_ADDRESS: &str = "0x3f2329C9ADFbcCd9A84f52c906E936A42dA18CB8";
pub const COSMOS_ADDRESS: &str = "cosmos15cenya0tr7nm3tz2wn3h3zwkht2rxrq7q7h3dj";

/// Check first account addresses match known vectors, the wallet must
/// be loaded with [TEST_MNEMONIC][crate::TEST_MNEMONIC]
pub async fn known_vectors(w: &dyn HdWallet) -> anyhow::Result<()> {
    let btc = w.as_bitcoin().ok_or(Error::Unsupported("bitcoin"))?;
    let p = btc.btc_get_account_paths(Coin::Bitcoin, 0).remove(0);
    let a = btc
        .btc_get_address(&BtcGetAddress {
            coin: Coin::Bitcoin,
            address_n: p.address(0),
            script_type: p.script_type,
            show_display: false,
        })
        .await?;
    assert_eq!(a, BTC_ADDRESS);

    let eth = w.as_ethereum().ok_or(Error::Unsupported("ethereum"))?;
    let p = eth.eth_get_account_paths(0).remove(0);
    let a = eth.eth_get_address(&GetAddress::new(p, false)).await?;
    assert_eq!(a, ETH_ADDRESS);

    let c = &proto::cosmos::COSMOS;
    let cosmos = w.as_cosmos_sdk(c).ok_or(Error::Unsupported("cosmos"))?;
    let p = cosmos.cosmos_get_account_paths(c, 0).remove(0);
    let a = cosmos.cosmos_get_address(c, &GetAddress::new(p, false)).await?;
    assert_eq!(a, COSMOS_ADDRESS);

    info!("known vectors OK");

    Ok(())
}

/// Derive addresses for `accounts` accounts on every supported chain,
/// comparing against a reference wallet
pub async fn test(w: &dyn HdWallet, mnemonic: &str, accounts: u32) -> anyhow::Result<()> {
    let r = reference(mnemonic).await?;

    if let Some(btc) = w.as_bitcoin() {
        let btc_ref = r.as_bitcoin().ok_or(Error::Unsupported("bitcoin"))?;

        for coin in [Coin::Bitcoin, Coin::Litecoin, Coin::Dogecoin] {
            for account in 0..accounts {
                for p in btc.btc_get_account_paths(coin, account) {
                    let req = BtcGetAddress {
                        coin,
                        address_n: p.address(0),
                        script_type: p.script_type,
                        show_display: false,
                    };

                    let a = btc.btc_get_address(&req).await?;
                    debug!("{} {} ({}): {}", coin, req.address_n, p.script_type, a);

                    assert_eq!(a, btc_ref.btc_get_address(&req).await?);
                }
            }
        }
    }

    if w.as_ethereum().is_some() {
        let (eth, eth_ref) = pair(w, &r, "ethereum", |w| w.as_ethereum())?;

        for account in 0..accounts {
            for p in eth.eth_get_account_paths(account) {
                let req = GetAddress::new(p, false);

                let a = eth.eth_get_address(&req).await?;
                debug!("eth {}: {}", req.address_n, a);

                assert_eq!(a, eth_ref.eth_get_address(&req).await?);
            }
        }
    }

    for c in CHAINS {
        let (cosmos, cosmos_ref) = match (w.as_cosmos_sdk(c), r.as_cosmos_sdk(c)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                debug!("skipping unsupported chain {}", c.name);
                continue;
            }
        };

        for account in 0..accounts {
            for p in cosmos.cosmos_get_account_paths(c, account) {
                let req = GetAddress::new(p, false);

                let a = cosmos.cosmos_get_address(c, &req).await?;
                debug!("{} {}: {}", c.name, req.address_n, a);

                assert!(a.starts_with(c.hrp));
                assert_eq!(a, cosmos_ref.cosmos_get_address(c, &req).await?);
            }
        }
    }

    if w.as_solana().is_some() {
        let (sol, sol_ref) = pair(w, &r, "solana", |w| w.as_solana())?;

        for account in 0..accounts {
            for p in sol.solana_get_account_paths(account) {
                let req = GetAddress::new(p, false);

                let a = sol.solana_get_address(&req).await?;
                debug!("solana {}: {}", req.address_n, a);

                assert_eq!(a, sol_ref.solana_get_address(&req).await?);
            }
        }
    }

    info!("addresses OK ({} accounts)", accounts);

    Ok(())
}
