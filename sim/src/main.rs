// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use log::{debug, info, LevelFilter};

use hdwallet_sim::*;

/// KeepKey protocol device emulator
///
/// Serves the device protocol over TCP for use with `hdwallet-cli`
/// or the `hdwallet` library (see `transport::TcpOptions`), with the
/// debug link on the following port.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// Listen address
    #[clap(long, default_value = "127.0.0.1:11044")]
    addr: SocketAddr,

    #[clap(flatten)]
    emulator_opts: Options,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    info!("Launching emulator...");

    let e = Arc::new(Emulator::new(args.emulator_opts)?);
    let h = e.listen(args.addr).await?;

    // Await listener exit or exit signal
    tokio::select!(
        r = h => {
            debug!("Listener exited: {:?}", r);
            r??;
        }
        // Exit on ctrl + c
        _ = tokio::signal::ctrl_c() => {
            debug!("Exit!");
        },
    );

    Ok(())
}
