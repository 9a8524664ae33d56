// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::Channel;
use crate::TransportError;

/// In-process channel, one end of a connected pair
#[derive(Debug)]
pub struct MemoryChannel {
    tx: Option<UnboundedSender<Vec<u8>>>,
    rx: UnboundedReceiver<Vec<u8>>,
}

impl MemoryChannel {
    /// Create a connected pair of channels
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = unbounded_channel();
        let (tx_b, rx_b) = unbounded_channel();

        (
            Self {
                tx: Some(tx_a),
                rx: rx_b,
            },
            Self {
                tx: Some(tx_b),
                rx: rx_a,
            },
        )
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::ChannelClosed)?;

        tx.send(frame.to_vec())
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        // mpsc receive is cancel safe
        self.rx.recv().await.ok_or(TransportError::ChannelClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the sender closes the peer's receive side
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn pair_exchange() {
        let (mut a, mut b) = MemoryChannel::pair();

        a.write(&[1, 2, 3]).await.unwrap();
        assert_eq!(b.read().await.unwrap(), vec![1, 2, 3]);

        b.write(&[4]).await.unwrap();
        assert_eq!(a.read().await.unwrap(), vec![4]);

        a.close().await.unwrap();
        assert!(matches!(
            b.read().await,
            Err(TransportError::ChannelClosed)
        ));
    }
}
