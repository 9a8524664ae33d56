// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Runtime-extensible message registry
//!
//! Codecs are registered by type identifier on a [RegistryBuilder], which
//! is then frozen into an immutable [Registry] for sharing between
//! transports. Registration is last-writer-wins per type identifier.

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt::Debug,
};

use crate::{Envelope, ProtocolError};

/// Type-erased protobuf message
pub trait DynMessage: Any + Debug + Send + Sync {
    /// Encode message payload
    fn encode_payload(&self) -> Vec<u8>;

    /// Rust type name, for diagnostics
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<M: prost::Message + Default + 'static> DynMessage for M {
    fn encode_payload(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    fn type_name(&self) -> &'static str {
        type_name::<M>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

type DecodeFn = fn(&[u8]) -> Result<Box<dyn DynMessage>, prost::DecodeError>;

fn decode_as<M: prost::Message + Default + 'static>(
    buff: &[u8],
) -> Result<Box<dyn DynMessage>, prost::DecodeError> {
    Ok(Box::new(M::decode(buff)?))
}

#[derive(Clone)]
struct Codec {
    name: String,
    rust_type: TypeId,
    decode: DecodeFn,
}

/// Builder for [Registry] instances
#[derive(Clone, Default)]
pub struct RegistryBuilder {
    codecs: HashMap<u32, Codec>,
}

impl RegistryBuilder {
    /// Create an empty registry builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register message type `M` under the provided identifier,
    /// replacing any existing registration
    pub fn register<M>(&mut self, type_id: u32, name: impl Into<String>) -> &mut Self
    where
        M: prost::Message + Default + 'static,
    {
        let c = Codec {
            name: name.into(),
            rust_type: TypeId::of::<M>(),
            decode: decode_as::<M>,
        };

        if let Some(_prev) = self.codecs.insert(type_id, c) {
            #[cfg(feature = "log")]
            log::debug!(
                "replaced registration for type {} ({} -> {})",
                type_id,
                _prev.name,
                self.codecs[&type_id].name
            );
        }

        self
    }

    /// Check whether a type identifier is registered
    pub fn contains(&self, type_id: u32) -> bool {
        self.codecs.contains_key(&type_id)
    }

    /// Freeze the builder into an immutable [Registry]
    pub fn build(self) -> Registry {
        Registry {
            codecs: self.codecs,
        }
    }
}

/// Immutable message registry, mapping type identifiers to codecs
#[derive(Clone)]
pub struct Registry {
    codecs: HashMap<u32, Codec>,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("types", &self.ids()).finish()
    }
}

impl Registry {
    /// Check whether a type identifier is registered
    pub fn contains(&self, type_id: u32) -> bool {
        self.codecs.contains_key(&type_id)
    }

    /// List registered type identifiers in ascending order
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<_> = self.codecs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Fetch the registered name for a type identifier
    pub fn name(&self, type_id: u32) -> Option<&str> {
        self.codecs.get(&type_id).map(|c| c.name.as_str())
    }

    /// Encode a message into an [Envelope] with the provided type identifier
    pub fn encode(&self, type_id: u32, m: &dyn DynMessage) -> Result<Envelope, ProtocolError> {
        let c = self
            .codecs
            .get(&type_id)
            .ok_or(ProtocolError::UnknownType(type_id))?;

        if m.as_any().type_id() != c.rust_type {
            return Err(ProtocolError::UnexpectedType {
                expected: c.name.clone(),
                actual: m.type_name().to_string(),
            });
        }

        let payload = m.encode_payload();

        #[cfg(feature = "log")]
        log::trace!("encode {} ({}): {:02x?}", c.name, type_id, payload);

        Ok(Envelope::new(type_id, payload))
    }

    /// Decode an [Envelope] using the registered codec
    pub fn decode(&self, e: &Envelope) -> Result<Decoded, ProtocolError> {
        self.decode_payload(e.type_id, &e.payload)
    }

    /// Decode a raw payload using the codec registered for `type_id`
    pub fn decode_payload(&self, type_id: u32, buff: &[u8]) -> Result<Decoded, ProtocolError> {
        let c = self
            .codecs
            .get(&type_id)
            .ok_or(ProtocolError::UnknownType(type_id))?;

        let message = (c.decode)(buff)?;

        Ok(Decoded {
            type_id,
            name: c.name.clone(),
            message,
        })
    }
}

/// Decoded message with its registered type information
#[derive(Debug)]
pub struct Decoded {
    type_id: u32,
    name: String,
    message: Box<dyn DynMessage>,
}

impl Decoded {
    /// Type identifier from the envelope
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Registered message name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the type-erased message
    pub fn message(&self) -> &dyn DynMessage {
        self.message.as_ref()
    }

    /// Check whether the decoded message is of type `M`
    pub fn is<M: 'static>(&self) -> bool {
        self.message.as_any().is::<M>()
    }

    /// Borrow the message as type `M`
    pub fn downcast_ref<M: 'static>(&self) -> Option<&M> {
        self.message.as_any().downcast_ref::<M>()
    }

    /// Consume and convert to message type `M`
    pub fn into_message<M: 'static>(self) -> Result<M, ProtocolError> {
        match self.message.into_any().downcast::<M>() {
            Ok(m) => Ok(*m),
            Err(_) => Err(ProtocolError::UnexpectedType {
                expected: type_name::<M>().to_string(),
                actual: self.name,
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::messages::{Address, Ping, Success};

    #[test]
    fn unknown_type_fails_closed() {
        let r = RegistryBuilder::new().build();

        assert_eq!(
            r.decode_payload(750, &[]).unwrap_err(),
            ProtocolError::UnknownType(750)
        );

        let p = Ping::default();
        assert_eq!(r.encode(1, &p).unwrap_err(), ProtocolError::UnknownType(1));
    }

    #[test]
    fn last_writer_wins() {
        let mut b = RegistryBuilder::new();
        b.register::<Success>(7, "Success");
        b.register::<Address>(7, "Address");
        let r = b.build();

        assert_eq!(r.name(7), Some("Address"));

        let a = Address {
            address: Some("abc".to_string()),
        };
        let e = r.encode(7, &a).unwrap();
        let d = r.decode(&e).unwrap();
        assert!(d.is::<Address>());
        assert_eq!(d.into_message::<Address>().unwrap(), a);
    }

    #[test]
    fn encode_type_mismatch() {
        let mut b = RegistryBuilder::new();
        b.register::<Success>(2, "Success");
        let r = b.build();

        let p = Ping::default();
        assert!(matches!(
            r.encode(2, &p),
            Err(ProtocolError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn downcast_mismatch() {
        let mut b = RegistryBuilder::new();
        b.register::<Success>(2, "Success");
        let r = b.build();

        let d = r.decode_payload(2, &[]).unwrap();
        assert_eq!(d.name(), "Success");
        assert!(d.downcast_ref::<Ping>().is_none());
        assert!(matches!(
            d.into_message::<Ping>(),
            Err(ProtocolError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn encoding_is_deterministic() {
        let r = crate::default_registry();

        let p = Ping {
            message: Some("Hello World".to_string()),
            button_protection: Some(true),
            ..Default::default()
        };

        let a = r.encode(1, &p).unwrap();
        let b = r.encode(1, &p.clone()).unwrap();
        assert_eq!(a, b);
    }
}
