// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{fmt::Display, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::engine::Error;

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// Helper to apply the hardened flag to an index
pub const fn hardened(index: u32) -> u32 {
    index | HARDENED
}

/// BIP-0032 derivation path, in the form `m/44'/0'/0'/0/0`
#[derive(Clone, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Bip32Path(Vec<u32>);

impl Bip32Path {
    /// Create a path from raw indices
    pub fn new(indices: impl Into<Vec<u32>>) -> Self {
        Self(indices.into())
    }

    /// Path indices
    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    /// Check whether every index in the path is hardened
    pub fn is_fully_hardened(&self) -> bool {
        self.0.iter().all(|i| i & HARDENED != 0)
    }

    /// Create a new path with the provided index appended
    pub fn child(&self, index: u32) -> Self {
        let mut p = self.0.clone();
        p.push(index);
        Self(p)
    }
}

impl Deref for Bip32Path {
    type Target = [u32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u32]> for Bip32Path {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for Bip32Path {
    fn from(v: Vec<u32>) -> Self {
        Self(v)
    }
}

impl<const N: usize> From<[u32; N]> for Bip32Path {
    fn from(v: [u32; N]) -> Self {
        Self(v.to_vec())
    }
}

impl From<Bip32Path> for Vec<u32> {
    fn from(p: Bip32Path) -> Self {
        p.0
    }
}

impl From<Bip32Path> for String {
    fn from(p: Bip32Path) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Bip32Path {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s)
    }
}

impl Display for Bip32Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m")?;
        for i in &self.0 {
            match i & HARDENED != 0 {
                true => write!(f, "/{}'", i & !HARDENED)?,
                false => write!(f, "/{i}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Bip32Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');

        if parts.next() != Some("m") {
            return Err(Error::InvalidPath);
        }

        let mut indices = vec![];
        for p in parts {
            let (n, h) = match p.strip_suffix('\'').or_else(|| p.strip_suffix('h')) {
                Some(n) => (n, true),
                None => (p, false),
            };

            let n = u32::from_str(n).map_err(|_| Error::InvalidPath)?;
            if n & HARDENED != 0 {
                return Err(Error::InvalidPath);
            }

            indices.push(if h { hardened(n) } else { n });
        }

        Ok(Self(indices))
    }
}
