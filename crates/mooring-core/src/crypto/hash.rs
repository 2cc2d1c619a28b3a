use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A 32-byte hash value.
///
/// Equality, ordering, and hashing are bytewise. The same representation
/// backs block hashes, transaction hashes, and sidechain identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Hash(pub [u8; 32]);

/// A sidechain identifier: an opaque 256-bit value treated as a pure
/// byte-string key. Uniqueness across all live sidechains is a global
/// invariant enforced by the state engine.
pub type ScId = Hash;

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn new(data: [u8; 32]) -> Self {
        Hash(data)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Some(Hash(bytes))
    }

    /// Parse from a hex string. Short strings are accepted and
    /// right-aligned into the 32-byte value, so `Hash::from_hex("1492")`
    /// works the way short literal ids do in fixtures.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let padded;
        let s = if s.len() % 2 == 1 {
            padded = format!("0{s}");
            padded.as_str()
        } else {
            s
        };
        let bytes = hex::decode(s)?;
        if bytes.len() > 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Hash(out))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the Blake3 hash of data.
pub fn hash_blake3(data: &[u8]) -> Hash {
    let hash = blake3::hash(data);
    Hash(*hash.as_bytes())
}

/// Canonical hash of a structured value: Blake3 over its deterministic
/// bincode encoding. Transaction and block identities are defined
/// through this function, so the encoding must never depend on
/// anything but the value itself.
pub fn hash_value<T: Serialize>(value: &T) -> Result<Hash, CoreError> {
    let bytes = bincode::serialize(value).map_err(|e| CoreError::Serialization(e.to_string()))?;
    Ok(hash_blake3(&bytes))
}

/// Compute a merkle root from a list of hashes, duplicating the last
/// node on odd levels.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::ZERO;
    }

    let mut current_level: Vec<Hash> = hashes.to_vec();

    while current_level.len() > 1 {
        let mut next_level = Vec::new();

        for chunk in current_level.chunks(2) {
            let mut data = Vec::with_capacity(64);
            data.extend_from_slice(&chunk[0].0);
            data.extend_from_slice(&chunk[chunk.len() - 1].0);
            next_level.push(hash_blake3(&data));
        }

        current_level = next_level;
    }

    current_level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        assert_eq!(hash_blake3(data), hash_blake3(data));
        assert_ne!(hash_blake3(data), Hash::ZERO);
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let hash = hash_blake3(b"test");
        let recovered = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, recovered);
    }

    #[test]
    fn test_short_hex_is_right_aligned() {
        let id = Hash::from_hex("1492").unwrap();
        assert_eq!(id.0[30], 0x14);
        assert_eq!(id.0[31], 0x92);
        assert!(id.0[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_merkle_root_empty_and_single() {
        assert_eq!(merkle_root(&[]), Hash::ZERO);
        let hash = hash_blake3(b"single");
        assert_eq!(merkle_root(&[hash]), hash);
    }

    #[test]
    fn test_merkle_root_multiple() {
        let hashes: Vec<Hash> = (0..5u8).map(|i| hash_blake3(&[i])).collect();
        assert_ne!(merkle_root(&hashes), Hash::ZERO);
        assert_ne!(merkle_root(&hashes), merkle_root(&hashes[..4]));
    }

    #[test]
    fn test_hash_value_is_deterministic() {
        let value = (42u64, "hello".to_string());
        assert_eq!(hash_value(&value).unwrap(), hash_value(&value).unwrap());
    }

    #[test]
    fn test_hash_value_tracks_contents() {
        let a = hash_value(&(1u64, "x")).unwrap();
        let b = hash_value(&(2u64, "x")).unwrap();
        assert_ne!(a, b);
    }
}
