// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use encdec::DecodeOwned;
use log::{debug, trace};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use hdwallet_proto::{EnvelopeHeader, HEADER_LEN};

use super::Channel;
use crate::TransportError;

/// TCP channel options
#[derive(Clone, PartialEq, Debug, clap::Parser)]
pub struct TcpOptions {
    /// Emulator / bridge address
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST), env = "HDWALLET_ADDR")]
    pub addr: IpAddr,

    /// Emulator / bridge port
    #[clap(long, default_value_t = 11044, env = "HDWALLET_PORT")]
    pub port: u16,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 11044,
        }
    }
}

impl TcpOptions {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// TCP channel, frames are sent as `header || payload`
pub struct TcpChannel {
    s: TcpStream,
    /// Buffered input, retained across cancelled reads
    buff: Vec<u8>,
}

impl TcpChannel {
    /// Connect to a TCP device or emulator
    pub async fn connect(opts: &TcpOptions) -> Result<Self, TransportError> {
        debug!("connecting to {}", opts.socket_addr());

        let s = TcpStream::connect(opts.socket_addr()).await?;
        s.set_nodelay(true)?;

        Ok(Self::from(s))
    }

    /// Length of the first complete frame in the buffer, if any
    fn frame_len(&self) -> Result<Option<usize>, TransportError> {
        if self.buff.len() < HEADER_LEN {
            return Ok(None);
        }

        let (h, _) = EnvelopeHeader::decode_owned(&self.buff[..HEADER_LEN]).map_err(|e| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{e:?}"),
            ))
        })?;

        let n = HEADER_LEN + h.len as usize;
        Ok((self.buff.len() >= n).then_some(n))
    }
}

impl From<TcpStream> for TcpChannel {
    fn from(s: TcpStream) -> Self {
        Self { s, buff: vec![] }
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        trace!("tx {} bytes", frame.len());

        self.s.write_all(frame).await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut chunk = [0u8; 1024];

        loop {
            if let Some(n) = self.frame_len()? {
                let frame: Vec<u8> = self.buff.drain(..n).collect();
                trace!("rx {} bytes", frame.len());
                return Ok(frame);
            }

            // `read` is cancel safe, data is only consumed once returned
            let n = self.s.read(&mut chunk).await?;
            if n == 0 {
                return Err(TransportError::ChannelClosed);
            }

            self.buff.extend_from_slice(&chunk[..n]);
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.s.shutdown().await?;
        Ok(())
    }
}
