// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] provides key isolation for software wallets and emulators.
//!
//! Keys are derived on demand via the loaded [Driver] and used only for
//! the duration of a single operation, callers receive public keys and
//! signatures, never private key material.

use bip32::{Prefix, XPrv};
use ed25519_dalek::Signer as _;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use strum::{Display, EnumString, EnumVariantNames};

mod driver;
pub use driver::{Driver, SeedDriver};

mod error;
pub use error::Error;

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames)]
pub enum State {
    /// No wallet loaded, operations return [Error::NeedsMnemonic]
    Unloaded,
    /// Wallet loaded and ready for use
    Loaded,
}

/// Recoverable secp256k1 signature
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RecoverableSignature {
    /// `r || s` signature bytes (low-S normalised)
    pub signature: [u8; 64],
    /// Public key recovery identifier (0..=3)
    pub recovery_id: u8,
}

impl RecoverableSignature {
    /// Recover the compressed public key from a signature over `digest`
    pub fn recover(&self, digest: &[u8; 32]) -> Result<[u8; 33], Error> {
        let sig = Signature::from_slice(&self.signature).map_err(|_| Error::InvalidSignature)?;
        let recid = RecoveryId::from_byte(self.recovery_id).ok_or(Error::InvalidSignature)?;

        let vk = VerifyingKey::recover_from_prehash(digest, &sig, recid)
            .map_err(|_| Error::InvalidSignature)?;

        compressed_bytes(&vk)
    }
}

/// Extended public key information for a derived node
#[derive(Clone, PartialEq, Debug)]
pub struct ExtendedPublic {
    /// Base58 `xpub` encoding
    pub xpub: String,
    pub depth: u8,
    pub parent_fingerprint: u32,
    pub child_number: u32,
    pub chain_code: [u8; 32],
    /// Compressed secp256k1 public key
    pub public_key: [u8; 33],
}

/// [Engine] provides hardware-independent key isolation for wallet operations
pub struct Engine<DRV: Driver> {
    state: State,
    drv: Option<DRV>,
}

impl<DRV: Driver> Default for Engine<DRV> {
    fn default() -> Self {
        Self::new()
    }
}

impl<DRV: Driver> Engine<DRV> {
    /// Create a new, unloaded, engine instance
    pub const fn new() -> Self {
        Self {
            state: State::Unloaded,
            drv: None,
        }
    }

    /// Fetch engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Check whether a wallet is loaded
    pub fn is_loaded(&self) -> bool {
        self.state == State::Loaded
    }

    /// Load a wallet, replacing any existing driver
    pub fn initialize_wallet(&mut self, drv: DRV) {
        #[cfg(feature = "log")]
        log::debug!("engine: load wallet (previous state: {})", self.state);

        self.drv = Some(drv);
        self.state = State::Loaded;
    }

    /// Discard the loaded wallet
    pub fn wipe(&mut self) {
        #[cfg(feature = "log")]
        log::debug!("engine: wipe");

        // Dropping the driver zeroizes seed material
        self.drv = None;
        self.state = State::Unloaded;
    }

    fn driver(&self) -> Result<&DRV, Error> {
        match (&self.state, &self.drv) {
            (State::Loaded, Some(d)) => Ok(d),
            _ => Err(Error::NeedsMnemonic),
        }
    }

    fn derive(&self, path: &[u32]) -> Result<XPrv, Error> {
        self.driver()?.bip32_derive_secp256k1(path)
    }

    /// Fetch the compressed secp256k1 public key for a path
    pub fn public_key(&self, path: &[u32]) -> Result<[u8; 33], Error> {
        let k = self.derive(path)?;
        Ok(k.public_key().to_bytes())
    }

    /// Fetch the uncompressed (SEC1, `0x04` prefixed) secp256k1 public key for a path
    pub fn public_key_uncompressed(&self, path: &[u32]) -> Result<[u8; 65], Error> {
        let k = self.derive(path)?;

        let p = k.private_key().verifying_key().to_encoded_point(false);

        let mut b = [0u8; 65];
        b.copy_from_slice(p.as_bytes());
        Ok(b)
    }

    /// Fetch extended public key information for a path
    pub fn xpub(&self, path: &[u32]) -> Result<ExtendedPublic, Error> {
        let k = self.derive(path)?;
        let p = k.public_key();
        let a = p.attrs();

        Ok(ExtendedPublic {
            xpub: p.to_string(Prefix::XPUB),
            depth: a.depth,
            parent_fingerprint: u32::from_be_bytes(a.parent_fingerprint),
            child_number: u32::from(a.child_number),
            chain_code: a.chain_code,
            public_key: p.to_bytes(),
        })
    }

    /// Sign a 32-byte digest with the secp256k1 key at `path` (RFC6979)
    pub fn sign_prehash(
        &self,
        path: &[u32],
        digest: &[u8; 32],
    ) -> Result<RecoverableSignature, Error> {
        let k = self.derive(path)?;

        let (sig, recid) = k
            .private_key()
            .sign_prehash_recoverable(digest)
            .map_err(|_| Error::SignError)?;

        let mut signature = [0u8; 64];
        signature.copy_from_slice(&sig.to_bytes());

        Ok(RecoverableSignature {
            signature,
            recovery_id: recid.to_byte(),
        })
    }

    /// Fetch the ed25519 public key for a (hardened) path
    pub fn ed25519_public_key(&self, path: &[u32]) -> Result<[u8; 32], Error> {
        let seed = self.driver()?.slip10_derive_ed25519(path);
        let k = ed25519_dalek::SigningKey::from_bytes(&seed);

        Ok(k.verifying_key().to_bytes())
    }

    /// Sign a message with the ed25519 key at `path`
    pub fn sign_ed25519(&self, path: &[u32], message: &[u8]) -> Result<[u8; 64], Error> {
        let seed = self.driver()?.slip10_derive_ed25519(path);
        let k = ed25519_dalek::SigningKey::from_bytes(&seed);

        Ok(k.sign(message).to_bytes())
    }
}

fn compressed_bytes(vk: &VerifyingKey) -> Result<[u8; 33], Error> {
    let p = vk.to_encoded_point(true);

    p.as_bytes().try_into().map_err(|_| Error::InvalidKey)
}

#[cfg(test)]
mod test {
    use ed25519_dalek::{Signature as EdSignature, Verifier, VerifyingKey as EdVerifyingKey};
    use sha2::{Digest, Sha256};

    use super::*;
    use crate::hardened;

    const MNEMONIC: &str = "alcohol woman abuse must during monitor noble actual mixed trade anger aisle";

    fn loaded() -> Engine<SeedDriver> {
        let mut e = Engine::new();
        e.initialize_wallet(SeedDriver::from_mnemonic(MNEMONIC, "").unwrap());
        e
    }

    #[test]
    fn unloaded_guard() {
        let e = Engine::<SeedDriver>::new();
        let p = [hardened(44), hardened(0), hardened(0), 0, 0];

        assert_eq!(e.state(), State::Unloaded);
        assert_eq!(e.public_key(&p), Err(Error::NeedsMnemonic));
        assert_eq!(e.xpub(&p).err(), Some(Error::NeedsMnemonic));
        assert_eq!(e.sign_prehash(&p, &[0u8; 32]), Err(Error::NeedsMnemonic));
        assert_eq!(e.ed25519_public_key(&p), Err(Error::NeedsMnemonic));
        assert_eq!(e.sign_ed25519(&p, b"abc"), Err(Error::NeedsMnemonic));
        assert_eq!(e.state(), State::Unloaded);
    }

    #[test]
    fn load_and_wipe() {
        let mut e = loaded();
        let p = [hardened(44), hardened(0), hardened(0), 0, 0];

        assert_eq!(e.state(), State::Loaded);
        let k = e.public_key(&p).unwrap();

        e.wipe();
        assert_eq!(e.state(), State::Unloaded);
        assert_eq!(e.public_key(&p), Err(Error::NeedsMnemonic));

        // Reload yields the same keys
        e.initialize_wallet(SeedDriver::from_mnemonic(MNEMONIC, "").unwrap());
        assert_eq!(e.public_key(&p).unwrap(), k);
    }

    #[test]
    fn deterministic_derivation() {
        let (a, b) = (loaded(), loaded());
        let p = [hardened(44), hardened(60), hardened(0), 0, 0];

        assert_eq!(a.public_key(&p).unwrap(), b.public_key(&p).unwrap());
        assert_eq!(a.xpub(&p).unwrap(), b.xpub(&p).unwrap());

        let compressed = a.public_key(&p).unwrap();
        let uncompressed = a.public_key_uncompressed(&p).unwrap();
        assert_eq!(uncompressed[0], 0x04);
        assert_eq!(&uncompressed[1..33], &compressed[1..]);
    }

    #[test]
    fn sign_and_recover() {
        let e = loaded();
        let p = [hardened(44), hardened(0), hardened(0), 0, 0];
        let digest: [u8; 32] = Sha256::digest(b"Hello World").into();

        let s1 = e.sign_prehash(&p, &digest).unwrap();
        let s2 = e.sign_prehash(&p, &digest).unwrap();
        assert_eq!(s1, s2, "RFC6979 signatures should be deterministic");

        assert_eq!(s1.recover(&digest).unwrap(), e.public_key(&p).unwrap());
    }

    #[test]
    fn ed25519_sign_verify() {
        let e = loaded();
        let p = [hardened(44), hardened(501), hardened(0), hardened(0)];

        let pk = e.ed25519_public_key(&p).unwrap();
        let sig = e.sign_ed25519(&p, b"solana message").unwrap();

        let vk = EdVerifyingKey::from_bytes(&pk).unwrap();
        vk.verify(b"solana message", &EdSignature::from_bytes(&sig))
            .unwrap();
    }
}
