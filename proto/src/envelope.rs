// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Envelope framing for device messages

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};

use crate::ProtocolError;

/// Encoded envelope header length
pub const HEADER_LEN: usize = 8;

/// Maximum accepted payload length
pub const MAX_PAYLOAD: usize = 1024 * 1024;

/// Envelope header, `[type_id: u32][length: u32]`, big endian
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EnvelopeHeader {
    pub type_id: u32,
    pub len: u32,
}

impl Encode for EnvelopeHeader {
    type Error = ProtocolError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(HEADER_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated);
        }

        BigEndian::write_u32(&mut buff[0..4], self.type_id);
        BigEndian::write_u32(&mut buff[4..8], self.len);

        Ok(HEADER_LEN)
    }
}

impl DecodeOwned for EnvelopeHeader {
    type Output = Self;

    type Error = ProtocolError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated);
        }

        let h = Self {
            type_id: BigEndian::read_u32(&buff[0..4]),
            len: BigEndian::read_u32(&buff[4..8]),
        };

        if h.len as usize > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidLength(h.len as usize));
        }

        Ok((h, HEADER_LEN))
    }
}

/// Framed device message, a type identifier and encoded payload
#[derive(Clone, PartialEq, Debug)]
pub struct Envelope {
    pub type_id: u32,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create a new envelope
    pub fn new(type_id: u32, payload: Vec<u8>) -> Self {
        Self { type_id, payload }
    }

    /// Fetch the header for this envelope
    pub fn header(&self) -> EnvelopeHeader {
        EnvelopeHeader {
            type_id: self.type_id,
            len: self.payload.len() as u32,
        }
    }

    /// Total encoded length (header and payload)
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Write the framed envelope into the provided buffer
    pub fn encode_into(&self, buff: &mut [u8]) -> Result<usize, ProtocolError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidLength(self.payload.len()));
        }
        if buff.len() < self.frame_len() {
            return Err(ProtocolError::Truncated);
        }

        let n = self.header().encode(buff)?;
        buff[n..][..self.payload.len()].copy_from_slice(&self.payload);

        Ok(n + self.payload.len())
    }

    /// Encode the framed envelope to a new vector
    pub fn to_frame(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buff = vec![0u8; self.frame_len()];
        self.encode_into(&mut buff)?;
        Ok(buff)
    }

    /// Decode a framed envelope, returning the envelope and bytes consumed
    pub fn decode_from(buff: &[u8]) -> Result<(Self, usize), ProtocolError> {
        let (h, n) = EnvelopeHeader::decode_owned(buff)?;
        let len = h.len as usize;

        if buff.len() < n + len {
            return Err(ProtocolError::Truncated);
        }

        let payload = buff[n..][..len].to_vec();

        Ok((Self::new(h.type_id, payload), n + len))
    }
}
