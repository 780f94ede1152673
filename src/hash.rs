// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::DecodeError;

/// Primary and secondary digest of a key
///
/// The primary digest selects the bucket, the secondary digest is
/// truncated into the tag that is matched inside the bucket.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct DigestPair {
    /// Digest used to select a bucket
    pub primary: u32,

    /// Digest used for the associative match inside a bucket
    pub secondary: u32,
}

impl DigestPair {
    /// Creates a digest pair from its parts.
    #[must_use]
    pub const fn new(primary: u32, secondary: u32) -> Self {
        Self { primary, secondary }
    }

    /// Unpacks a digest pair from a single 64-bit value.
    ///
    /// The primary digest lives in the lower 32 bits.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "splitting into halves")]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            primary: raw as u32,
            secondary: (raw >> 32) as u32,
        }
    }

    /// Packs the digest pair into a single 64-bit value.
    ///
    /// This allows carrying a precomputed hash next to a key, see
    /// [`CamHashTable::lookup_with_digest`](crate::CamHashTable::lookup_with_digest).
    #[must_use]
    pub const fn into_raw(self) -> u64 {
        ((self.secondary as u64) << 32) | self.primary as u64
    }
}

/// Hash functions used to derive the digest pair of a key
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum HashFunction {
    /// CRC-32 (IEEE) as primary, CRC-32C (Castagnoli) as secondary digest
    #[default]
    Crc,

    /// Lower and upper 64-bit halves of XXH3-128, each truncated to 32 bits
    Xxh3,
}

impl HashFunction {
    /// Computes the digest pair of a key.
    #[must_use]
    pub fn digest(self, key: &[u8]) -> DigestPair {
        match self {
            Self::Crc => DigestPair::new(crc32fast::hash(key), crc32c::crc32c(key)),
            Self::Xxh3 => {
                let h = xxhash_rust::xxh3::xxh3_128(key);

                #[expect(clippy::cast_possible_truncation, reason = "digests are 32 bits")]
                let (lo, hi) = (h as u32, (h >> 64) as u32);

                DigestPair::new(lo, hi)
            }
        }
    }
}

impl From<HashFunction> for u8 {
    fn from(value: HashFunction) -> Self {
        match value {
            HashFunction::Crc => 0,
            HashFunction::Xxh3 => 1,
        }
    }
}

impl TryFrom<u8> for HashFunction {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Crc),
            1 => Ok(Self::Xxh3),
            _ => Err(DecodeError::InvalidTag(("HashFunction", value))),
        }
    }
}

/// Computes the CRC-32/CRC-32C digest pair of a key.
///
/// Keys are expected to be a multiple of 4 bytes long,
/// and at most [`MAX_KEY_SIZE`](crate::MAX_KEY_SIZE) bytes.
#[must_use]
pub fn compute_digests(key: &[u8]) -> DigestPair {
    debug_assert!(key.len().is_multiple_of(4), "key size should be a multiple of 4");
    debug_assert!(key.len() <= crate::MAX_KEY_SIZE, "key is too large");

    HashFunction::Crc.digest(key)
}
