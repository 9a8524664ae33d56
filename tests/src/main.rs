// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::Arc;

use clap::Parser;
use log::{debug, info, LevelFilter};
use strum::{Display, EnumString, EnumVariantNames};

use hdwallet::{
    adapter::{Connect, KeepKeyAdapter, NativeAdapter, NativeOptions},
    proto::cosmos::CosmosChain,
    transport::TcpOptions,
    *,
};
use hdwallet_tests::*;

/// Test CLI arguments
#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub test: Tests,

    /// Target for test execution
    #[clap(long, value_enum, default_value = "tcp", env)]
    pub target: Target,

    #[clap(flatten)]
    pub tcp: TcpOptions,

    /// bip39 Mnemonic (must be shared between test util and target)
    #[clap(long, env, default_value = TEST_MNEMONIC)]
    pub mnemonic: String,

    /// Log level
    #[clap(long, default_value = "debug", env)]
    pub log_level: LevelFilter,

    /// Enable logging for transports
    #[clap(long)]
    pub log_transports: bool,
}

/// Test modes
#[derive(Clone, PartialEq, Debug, Parser, Display, EnumString, EnumVariantNames)]
pub enum Tests {
    /// Check addresses against known vectors (requires the test mnemonic)
    KnownVectors,
    /// Test address derivation for each supported chain
    Addresses {
        /// Number of accounts to derive
        #[clap(long, default_value = "2")]
        accounts: u32,
    },
    /// Test bitcoin and ethereum message signing
    SignMessage {
        #[clap(long, default_value = "Hello World")]
        message: String,
    },
    /// Test ethereum transaction signing
    EthTx {
        /// Length of transaction calldata
        #[clap(long, default_value = "2500")]
        data_len: usize,

        /// Sign an EIP-1559 transaction
        #[clap(long)]
        eip1559: bool,
    },
    /// Test cosmos-sdk family transaction signing
    CosmosTx {
        /// Chain name
        #[clap(long, default_value = "cosmos")]
        chain: String,
    },
    /// Test solana transaction signing
    SolanaTx,
}

/// Test target connection
#[derive(Clone, PartialEq, Debug, clap::ValueEnum, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum Target {
    /// TCP connection for devices or the emulator
    Tcp,
    /// Native (software) wallet
    Native,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load command line options
    let opts = Opts::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    if !opts.log_transports {
        c.add_filter_ignore_str("hdwallet::transport");
    }

    let _ = simplelog::SimpleLogger::init(opts.log_level, c.build());

    debug!("options: {:?}", opts);

    info!("Running test '{}' via {}", opts.test, opts.target);

    let keyring = Keyring::new();

    // Connect to target and execute test
    let w: Arc<dyn HdWallet> = match opts.target {
        Target::Tcp => {
            let a = KeepKeyAdapter::new(Arc::new(default_registry()), Config::default());
            a.pair_device(&keyring, &opts.tcp).await? as Arc<dyn HdWallet>
        }
        Target::Native => {
            let o = NativeOptions {
                device_id: "native".to_string(),
                label: "native".to_string(),
                mnemonic: Some(opts.mnemonic.clone()),
            };
            NativeAdapter.pair_device(&keyring, &o).await? as Arc<dyn HdWallet>
        }
    };

    let r = execute(w.as_ref(), &opts).await;

    keyring.remove_all().await;

    r?;

    info!("Test OK!");

    Ok(())
}

/// Execute a test with the provided wallet
async fn execute(w: &dyn HdWallet, opts: &Opts) -> anyhow::Result<()> {
    let mnemonic = opts.mnemonic.as_str();

    match &opts.test {
        Tests::KnownVectors => address::known_vectors(w).await?,
        Tests::Addresses { accounts } => address::test(w, mnemonic, *accounts).await?,
        Tests::SignMessage { message } => message::test(w, mnemonic, message).await?,
        Tests::EthTx { data_len, eip1559 } => {
            ethereum::test(w, mnemonic, ethereum::test_tx(*data_len, *eip1559)).await?
        }
        Tests::CosmosTx { chain } => {
            let c = CosmosChain::by_name(chain)
                .ok_or_else(|| anyhow::anyhow!("unknown chain: {chain}"))?;
            cosmos::test(w, mnemonic, c).await?
        }
        Tests::SolanaTx => solana::test(w, mnemonic, b"solana test transaction").await?,
    }

    Ok(())
}
