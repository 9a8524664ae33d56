// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with hardware and software wallets

use std::sync::Arc;

use clap::Parser;
use log::{debug, info, warn, LevelFilter};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::unbounded_channel,
};
use zeroize::Zeroizing;

use hdwallet::{
    adapter::{Connect, KeepKeyAdapter, NativeAdapter, NativeOptions},
    proto::cosmos::CosmosChain,
    transport::TcpOptions,
    *,
};

mod helpers;
use helpers::*;

/// Wallet command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Configuration file (TOML)
    #[clap(long, env = "HDWALLET_CONFIG")]
    config: Option<String>,

    /// Use a native (software) wallet in place of a device
    #[clap(long)]
    native: bool,

    /// Mnemonic for native wallets
    #[clap(long, env = "HDWALLET_MNEMONIC", hide_env_values = true)]
    mnemonic: Option<String>,

    /// Device / emulator connection
    #[clap(flatten)]
    tcp: TcpOptions,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Supported chains
#[derive(Copy, Clone, PartialEq, Debug, clap::ValueEnum, strum::Display)]
enum Chain {
    Bitcoin,
    Litecoin,
    Dogecoin,
    Ethereum,
    Cosmos,
    Osmosis,
    Kujira,
    Thorchain,
    Solana,
}

impl Chain {
    fn coin(&self) -> Option<Coin> {
        match self {
            Chain::Bitcoin => Some(Coin::Bitcoin),
            Chain::Litecoin => Some(Coin::Litecoin),
            Chain::Dogecoin => Some(Coin::Dogecoin),
            _ => None,
        }
    }

    fn cosmos(&self) -> Option<&'static CosmosChain> {
        CosmosChain::by_name(&self.to_string())
    }
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Fetch wallet features
    Features,

    /// Ping the wallet
    Ping {
        #[clap(default_value = "hello")]
        message: String,

        /// Require button confirmation
        #[clap(long)]
        button: bool,
    },

    /// Fetch receive addresses for an account
    Address {
        #[clap(value_enum)]
        chain: Chain,

        /// Account index
        #[clap(long, default_value = "0")]
        account: u32,

        /// Show address on the device for confirmation
        #[clap(long)]
        show: bool,
    },

    /// Fetch the extended public key for a derivation path
    PublicKey {
        /// BIP-0032 path, for example `m/44'/0'/0'`
        path: Bip32Path,
    },

    /// Sign a message with the first account key
    SignMessage {
        #[clap(value_enum)]
        chain: Chain,

        /// Account index
        #[clap(long, default_value = "0")]
        account: u32,

        message: String,
    },

    /// Verify a signed message
    VerifyMessage {
        #[clap(value_enum)]
        chain: Chain,

        address: String,

        message: String,

        /// Hex encoded 65-byte signature
        signature: HexData<65>,
    },

    /// Sign a transaction from a JSON request file (cosmos-sdk or solana)
    SignTx {
        #[clap(value_enum)]
        chain: Chain,

        /// Sign request file
        #[clap(long)]
        input: String,

        /// Output file, signed transactions are written to stdout if unset
        #[clap(long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    let config = match &args.config {
        Some(f) => Config::load(f)?,
        None => Config::default(),
    };

    debug!("Using config: {:?}", config);

    let keyring = Keyring::new();

    // Forward interactive requests to the prompt loop
    let (tx, mut rx) = unbounded_channel();
    for n in [EventName::PinRequest, EventName::PassphraseRequest] {
        let tx = tx.clone();
        keyring.on(Pattern::any().name(n), move |e| {
            tx.send(e.name)?;
            Ok(())
        });
    }
    keyring.on(Pattern::any().name(EventName::ButtonRequest), |_| {
        info!("Confirm on device");
        Ok(())
    });
    keyring.on(Pattern::any().name(EventName::MnemonicRequired), |_| {
        warn!("Wallet not loaded, provide a mnemonic via --mnemonic");
        Ok(())
    });

    // Pair wallet
    let wallet = match args.native {
        true => {
            let opts = NativeOptions {
                device_id: "native".to_string(),
                label: "native".to_string(),
                mnemonic: args.mnemonic.clone(),
            };
            NativeAdapter.pair_device(&keyring, &opts).await? as Arc<dyn HdWallet>
        }
        false => {
            let a = KeepKeyAdapter::new(Arc::new(default_registry()), config);
            a.pair_device(&keyring, &args.tcp).await? as Arc<dyn HdWallet>
        }
    };

    info!("Paired {} wallet {}", wallet.vendor(), wallet.device_id());

    // Execute command, prompting for PIN / passphrase as requested
    let cmd = execute(wallet.as_ref(), args.cmd);
    tokio::pin!(cmd);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let r = loop {
        tokio::select! {
            r = &mut cmd => break r,
            Some(n) = rx.recv() => {
                info!("{} received, enter response:", n);

                let v = Zeroizing::new(stdin.next_line().await?.unwrap_or_default());
                match n {
                    EventName::PinRequest => wallet.send_pin(&v).await?,
                    _ => wallet.send_passphrase(&v).await?,
                }
            }
        }
    };

    keyring.remove_all().await;

    r
}

/// Execute a command against the provided wallet
async fn execute(w: &dyn HdWallet, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Features => {
            write_output(None, &w.features().await?).await?;
        }
        Actions::Ping { message, button } => {
            let r = w.ping(&Ping { message, button }).await?;
            info!("Pong: {}", r);
        }
        Actions::Address {
            chain,
            account,
            show,
        } => {
            if let Some(coin) = chain.coin() {
                let btc = w.as_bitcoin().ok_or(Error::Unsupported("bitcoin"))?;

                for p in btc.btc_get_account_paths(coin, account) {
                    let req = BtcGetAddress {
                        coin,
                        address_n: p.address(0),
                        script_type: p.script_type,
                        show_display: show,
                    };
                    let a = btc.btc_get_address(&req).await?;

                    info!("{} ({}): {}", req.address_n, p.script_type, a);
                }
            } else if let Some(c) = chain.cosmos() {
                let cosmos = w.as_cosmos_sdk(c).ok_or(Error::Unsupported("cosmos-sdk chain"))?;

                for p in cosmos.cosmos_get_account_paths(c, account) {
                    let a = cosmos
                        .cosmos_get_address(c, &GetAddress::new(p.clone(), show))
                        .await?;
                    info!("{}: {}", p, a);
                }
            } else if chain == Chain::Ethereum {
                let eth = w.as_ethereum().ok_or(Error::Unsupported("ethereum"))?;

                for p in eth.eth_get_account_paths(account) {
                    let a = eth.eth_get_address(&GetAddress::new(p.clone(), show)).await?;
                    info!("{}: {}", p, a);
                }
            } else {
                let sol = w.as_solana().ok_or(Error::Unsupported("solana"))?;

                for p in sol.solana_get_account_paths(account) {
                    let a = sol
                        .solana_get_address(&GetAddress::new(p.clone(), show))
                        .await?;
                    info!("{}: {}", p, a);
                }
            }
        }
        Actions::PublicKey { path } => {
            let req = GetPublicKey {
                address_n: path,
                coin_name: None,
                show_display: false,
            };

            for k in w.get_public_keys(&[req]).await? {
                info!("xpub: {}", k.xpub);
            }
        }
        Actions::SignMessage {
            chain,
            account,
            message,
        } => {
            if let Some(coin) = chain.coin() {
                let btc = w.as_bitcoin().ok_or(Error::Unsupported("bitcoin"))?;
                let p = btc.btc_get_account_paths(coin, account).remove(0);

                let r = btc
                    .btc_sign_message(&BtcSignMessage {
                        coin,
                        address_n: p.address(0),
                        script_type: p.script_type,
                        message: message.into_bytes(),
                    })
                    .await?;

                info!("address: {}", r.address);
                info!("signature: {}", hex::encode(r.signature));
            } else if chain == Chain::Ethereum {
                let eth = w.as_ethereum().ok_or(Error::Unsupported("ethereum"))?;
                let p = eth.eth_get_account_paths(account).remove(0);

                let r = eth
                    .eth_sign_message(&EthSignMessage {
                        address_n: p,
                        message: message.into_bytes(),
                    })
                    .await?;

                info!("address: {}", r.address);
                info!("signature: {}", hex::encode(r.signature));
            } else {
                return Err(anyhow::anyhow!("message signing unsupported for {chain}"));
            }
        }
        Actions::VerifyMessage {
            chain,
            address,
            message,
            signature,
        } => {
            let ok = if let Some(coin) = chain.coin() {
                let btc = w.as_bitcoin().ok_or(Error::Unsupported("bitcoin"))?;
                btc.btc_verify_message(&BtcVerifyMessage {
                    coin,
                    address,
                    message: message.into_bytes(),
                    signature: signature.as_ref().to_vec(),
                })
                .await?
            } else if chain == Chain::Ethereum {
                let eth = w.as_ethereum().ok_or(Error::Unsupported("ethereum"))?;
                eth.eth_verify_message(&EthVerifyMessage {
                    address,
                    message: message.into_bytes(),
                    signature: signature.as_ref().to_vec(),
                })
                .await?
            } else {
                return Err(anyhow::anyhow!("message verification unsupported for {chain}"));
            };

            info!("signature valid: {}", ok);
        }
        Actions::SignTx {
            chain,
            input,
            output,
        } => {
            if let Some(c) = chain.cosmos() {
                let cosmos = w.as_cosmos_sdk(c).ok_or(Error::Unsupported("cosmos-sdk chain"))?;

                let req: CosmosSignTx = read_input(&input).await?;
                let r = cosmos.cosmos_sign_tx(c, &req).await?;

                write_output(output.as_deref(), &r.tx).await?;
            } else if chain == Chain::Solana {
                let sol = w.as_solana().ok_or(Error::Unsupported("solana"))?;

                let req: SolanaSignTx = read_input(&input).await?;
                let r = sol.solana_sign_tx(&req).await?;

                write_output(output.as_deref(), &r).await?;
            } else {
                return Err(anyhow::anyhow!("transaction signing unsupported for {chain}"));
            }
        }
    }

    Ok(())
}
