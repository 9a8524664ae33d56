// Copyright (c) 2022-2023 The MobileCoin Foundation

use bip32::{ChildNumber, XPrv};
use bip39::{Language, Mnemonic, Seed};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use super::Error;
use crate::HARDENED;

/// Domain separator for dummy seeds
const DUMMY_SEED_DOMAIN: &[u8] = b"hdwallet-dummy-seed";

/// [`Driver`] trait provides key derivation for [`Engine`][super::Engine] instances
pub trait Driver {
    /// BIP-0032 derivation for secp256k1 keys
    fn bip32_derive_secp256k1(&self, path: &[u32]) -> Result<XPrv, Error>;

    /// SLIP-0010 derivation for ed25519 keys, all indices are hardened
    fn slip10_derive_ed25519(&self, path: &[u32]) -> Zeroizing<[u8; 32]>;
}

impl<T: Driver + ?Sized> Driver for Box<T> {
    fn bip32_derive_secp256k1(&self, path: &[u32]) -> Result<XPrv, Error> {
        T::bip32_derive_secp256k1(self, path)
    }

    fn slip10_derive_ed25519(&self, path: &[u32]) -> Zeroizing<[u8; 32]> {
        T::slip10_derive_ed25519(self, path)
    }
}

/// Seed backed [Driver], from a BIP-0039 mnemonic, raw seed, or dummy seed string
pub struct SeedDriver {
    seed: Zeroizing<Vec<u8>>,
}

impl SeedDriver {
    /// Create a driver from raw seed bytes (16 to 64 bytes)
    pub fn from_seed(seed: &[u8]) -> Result<Self, Error> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(Error::Derivation);
        }

        Ok(Self {
            seed: Zeroizing::new(seed.to_vec()),
        })
    }

    /// Create a driver from a BIP-0039 mnemonic and optional passphrase
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self, Error> {
        let m = Mnemonic::from_phrase(phrase.trim(), Language::English)
            .map_err(|_| Error::InvalidMnemonic)?;
        let seed = Seed::new(&m, passphrase);

        Self::from_seed(seed.as_bytes())
    }

    /// Create a deterministic test driver from an arbitrary seed string
    /// (for example a list of known test xpubs).
    ///
    /// The same string always yields the same wallet, this MUST NOT be
    /// used for real funds.
    pub fn dummy(seed: &str) -> Self {
        let mut h = Sha512::new();
        h.update(DUMMY_SEED_DOMAIN);
        h.update(seed.as_bytes());

        Self {
            seed: Zeroizing::new(h.finalize().to_vec()),
        }
    }
}

impl Driver for SeedDriver {
    fn bip32_derive_secp256k1(&self, path: &[u32]) -> Result<XPrv, Error> {
        let mut k = XPrv::new(self.seed.as_slice()).map_err(|_| Error::Derivation)?;

        for i in path {
            let c = ChildNumber::new(i & !HARDENED, i & HARDENED != 0)
                .map_err(|_| Error::InvalidPath)?;
            k = k.derive_child(c).map_err(|_| Error::Derivation)?;
        }

        Ok(k)
    }

    fn slip10_derive_ed25519(&self, path: &[u32]) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(slip10_ed25519::derive_ed25519_private_key(
            &self.seed, path,
        ))
    }
}

#[cfg(test)]
mod test {
    use bip32::Prefix;

    use super::*;
    use crate::hardened;

    #[test]
    fn bip32_vector_1() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let d = SeedDriver::from_seed(&seed).unwrap();

        let m = d.bip32_derive_secp256k1(&[]).unwrap();
        assert_eq!(
            m.public_key().to_string(Prefix::XPUB),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );

        let k = d.bip32_derive_secp256k1(&[hardened(0)]).unwrap();
        assert_eq!(
            k.public_key().to_string(Prefix::XPUB),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );
    }

    #[test]
    fn slip10_vector_1() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let d = SeedDriver::from_seed(&seed).unwrap();

        let k = d.slip10_derive_ed25519(&[hardened(0)]);
        assert_eq!(
            hex::encode(k.as_ref()),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn dummy_is_deterministic() {
        let a = SeedDriver::dummy("xpub-a xpub-b");
        let b = SeedDriver::dummy("xpub-a xpub-b");
        let c = SeedDriver::dummy("xpub-a xpub-c");

        let p = [hardened(44), hardened(0), hardened(0), 0, 0];
        let ka = a.bip32_derive_secp256k1(&p).unwrap();
        let kb = b.bip32_derive_secp256k1(&p).unwrap();
        let kc = c.bip32_derive_secp256k1(&p).unwrap();

        assert_eq!(ka.public_key().to_bytes(), kb.public_key().to_bytes());
        assert_ne!(ka.public_key().to_bytes(), kc.public_key().to_bytes());
    }

    #[test]
    fn invalid_mnemonic() {
        assert_eq!(
            SeedDriver::from_mnemonic("not a mnemonic", "").err(),
            Some(Error::InvalidMnemonic)
        );
    }
}
