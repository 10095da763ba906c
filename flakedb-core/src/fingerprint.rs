// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Content fingerprints identifying a package database.

use std::fmt;
use std::str::FromStr;

use data_encoding::HEXLOWER;
use ring::digest;
use thiserror::Error;

/// Size of a fingerprint digest in bytes.
pub const FINGERPRINT_SIZE: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint has wrong length {0}, expected {FINGERPRINT_SIZE} bytes")]
    InvalidLength(usize),

    #[error("fingerprint is not valid hex: {0}")]
    InvalidHex(#[from] data_encoding::DecodeError),
}

/// A 256-bit content digest of a locked source reference.
///
/// The fingerprint is the identity of a database: the database file name is
/// the lowercase-hex rendering of this value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    pub const fn new(bytes: [u8; FINGERPRINT_SIZE]) -> Self {
        Fingerprint(bytes)
    }

    /// SHA-256 of `data`. Used by callers to fingerprint a locked reference.
    pub fn digest<B: AsRef<[u8]>>(data: B) -> Self {
        let digest = digest::digest(&digest::SHA256, data.as_ref());
        let mut bytes = [0u8; FINGERPRINT_SIZE];
        bytes.copy_from_slice(digest.as_ref());
        Fingerprint(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        if bytes.len() != FINGERPRINT_SIZE {
            return Err(FingerprintError::InvalidLength(bytes.len()));
        }
        let mut out = [0u8; FINGERPRINT_SIZE];
        out.copy_from_slice(bytes);
        Ok(Fingerprint(out))
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = HEXLOWER.decode(s.as_bytes())?;
        Fingerprint::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        let a = Fingerprint::digest("github:NixOS/nixpkgs/0000000000000000000000000000000000000000");
        let b = Fingerprint::digest("github:NixOS/nixpkgs/0000000000000000000000000000000000000000");
        assert_eq!(a, b);
        assert_ne!(a, Fingerprint::digest("github:NixOS/nixpkgs/other"));
    }

    #[test]
    fn hex_roundtrip() {
        let fp = Fingerprint::digest("abc");
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex.parse::<Fingerprint>().unwrap(), fp);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            "abcd".parse::<Fingerprint>(),
            Err(FingerprintError::InvalidLength(2))
        ));
        assert!("zz".repeat(32).parse::<Fingerprint>().is_err());
    }

    #[test]
    fn known_digest() {
        // sha256("abc"), from RFC 4634
        let fp = Fingerprint::digest("abc");
        assert_eq!(
            fp.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
