// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;
use strum::Display;

use super::MemoryChannel;
#[cfg(feature = "transport_tcp")]
use super::TcpChannel;
use crate::TransportError;

/// Byte channel carrying whole envelope frames to and from a device.
///
/// `read` must be cancel safe, a timed-out read must not lose a
/// partially received frame.
#[async_trait]
pub trait Channel: Send + 'static {
    /// Open the channel (no-op for channels connected on creation)
    async fn open(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Write a single encoded frame
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Read a single encoded frame
    async fn read(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Close the channel
    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Generic channel (abstract over channel types)
#[derive(Display)]
#[non_exhaustive]
pub enum GenericChannel {
    Memory(MemoryChannel),
    #[cfg(feature = "transport_tcp")]
    Tcp(TcpChannel),
}

impl From<MemoryChannel> for GenericChannel {
    fn from(c: MemoryChannel) -> Self {
        Self::Memory(c)
    }
}

#[cfg(feature = "transport_tcp")]
impl From<TcpChannel> for GenericChannel {
    fn from(c: TcpChannel) -> Self {
        Self::Tcp(c)
    }
}

#[async_trait]
impl Channel for GenericChannel {
    async fn open(&mut self) -> Result<(), TransportError> {
        match self {
            Self::Memory(c) => c.open().await,
            #[cfg(feature = "transport_tcp")]
            Self::Tcp(c) => c.open().await,
        }
    }

    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        match self {
            Self::Memory(c) => c.write(frame).await,
            #[cfg(feature = "transport_tcp")]
            Self::Tcp(c) => c.write(frame).await,
        }
    }

    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        match self {
            Self::Memory(c) => c.read().await,
            #[cfg(feature = "transport_tcp")]
            Self::Tcp(c) => c.read().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self {
            Self::Memory(c) => c.close().await,
            #[cfg(feature = "transport_tcp")]
            Self::Tcp(c) => c.close().await,
        }
    }
}
