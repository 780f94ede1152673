// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod insert_policy;

pub use insert_policy::InsertPolicy;

use crate::{
    coding::{Decode, Encode},
    matcher::{AtomicBucketMatcher, BucketMatcher},
    CamHashTable, Error, HashFunction,
};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Write};

/// Maximum size of a key in bytes
pub const MAX_KEY_SIZE: usize = 32;

/// Maximum size of a key table record in bytes
pub const MAX_ENTRY_SIZE: usize = 64;

/// Maximum number of slots per bucket
pub const MAX_BUCKET_WIDTH: usize = 64;

/// Default number of slots per bucket
pub const DEFAULT_BUCKET_WIDTH: usize = 8;

/// Default number of secondary digest bits kept in a tag
pub const DEFAULT_TAG_BITS: u8 = 24;

/// Table configuration builder
///
/// # Examples
///
/// ```
/// use cam_hash::{Config, InsertPolicy};
///
/// let table = Config::new(4_096)
///     .key_size(12)
///     .entry_size(16)
///     .insert_policy(InsertPolicy::ConfirmKey)
///     .open()?;
///
/// assert_eq!(512, table.bucket_count());
/// #
/// # Ok::<(), cam_hash::Error>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Total number of slots
    ///
    /// Must be a multiple of the bucket width, and the resulting
    /// bucket count must be a power of two.
    pub entries: usize,

    /// Number of slots per bucket
    pub bucket_width: usize,

    /// Size of a key in bytes
    pub key_size: usize,

    /// Size of a key table record in bytes, defaults to the key size
    ///
    /// Bytes after the key can hold data associated with the entry.
    pub entry_size: Option<usize>,

    /// Number of secondary digest bits kept in a tag
    pub tag_bits: u8,

    /// Hash functions used to compute the digest pair
    pub hash_function: HashFunction,

    /// Behaviour of inserts on tag matches
    pub insert_policy: InsertPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entries: /* 8_192 buckets */ 65_536,
            bucket_width: DEFAULT_BUCKET_WIDTH,
            key_size: 16,
            entry_size: None,
            tag_bits: DEFAULT_TAG_BITS,
            hash_function: HashFunction::default(),
            insert_policy: InsertPolicy::default(),
        }
    }
}

impl Config {
    /// Initializes a new config with the given total number of slots.
    #[must_use]
    pub fn new(entries: usize) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    /// Sets the number of slots per bucket.
    ///
    /// This is the hard limit of keys sharing a primary digest bucket.
    ///
    /// Defaults to 8.
    #[must_use]
    pub fn bucket_width(mut self, width: usize) -> Self {
        self.bucket_width = width;
        self
    }

    /// Sets the key size in bytes.
    ///
    /// Must be a multiple of 4, and at most [`MAX_KEY_SIZE`].
    ///
    /// Defaults to 16.
    #[must_use]
    pub fn key_size(mut self, bytes: usize) -> Self {
        self.key_size = bytes;
        self
    }

    /// Sets the key table record size in bytes.
    ///
    /// Must be a multiple of 4, at least the key size and at most [`MAX_ENTRY_SIZE`].
    ///
    /// Defaults to the key size.
    #[must_use]
    pub fn entry_size(mut self, bytes: usize) -> Self {
        self.entry_size = Some(bytes);
        self
    }

    /// Sets the tag width in bits.
    ///
    /// Wider tags make it less likely for distinct keys in the same bucket to
    /// share a tag. Bit 0 of every tag is reserved to tell tags from free slots.
    ///
    /// Defaults to 24.
    #[must_use]
    pub fn tag_bits(mut self, bits: u8) -> Self {
        self.tag_bits = bits;
        self
    }

    /// Sets the hash functions used to compute digests.
    ///
    /// Defaults to CRC-32 + CRC-32C.
    #[must_use]
    pub fn hash_function(mut self, function: HashFunction) -> Self {
        self.hash_function = function;
        self
    }

    /// Sets the insert behaviour on tag matches.
    ///
    /// Defaults to [`InsertPolicy::TrustTag`].
    #[must_use]
    pub fn insert_policy(mut self, policy: InsertPolicy) -> Self {
        self.insert_policy = policy;
        self
    }

    pub(crate) fn resolved_entry_size(&self) -> usize {
        self.entry_size.unwrap_or(self.key_size)
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.entries / self.bucket_width
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        let entry_size = self.resolved_entry_size();

        if self.bucket_width == 0 || self.bucket_width > MAX_BUCKET_WIDTH {
            return Err(Error::InvalidConfig("bucket width should be in 1..=64"));
        }

        if self.entries == 0 || !self.entries.is_multiple_of(self.bucket_width) {
            return Err(Error::InvalidConfig(
                "entries should be a non-zero multiple of the bucket width",
            ));
        }

        if !self.bucket_count().is_power_of_two() {
            return Err(Error::InvalidConfig("bucket count should be a power of two"));
        }

        if u32::try_from(self.entries).is_err() {
            return Err(Error::InvalidConfig("entries should fit into 32 bits"));
        }

        if self.key_size == 0 || !self.key_size.is_multiple_of(4) || self.key_size > MAX_KEY_SIZE {
            return Err(Error::InvalidConfig(
                "key size should be a non-zero multiple of 4, at most 32",
            ));
        }

        if !entry_size.is_multiple_of(4) || entry_size < self.key_size || entry_size > MAX_ENTRY_SIZE {
            return Err(Error::InvalidConfig(
                "entry size should be a multiple of 4, between the key size and 64",
            ));
        }

        if !(1..=32).contains(&self.tag_bits) {
            return Err(Error::InvalidConfig("tag bits should be in 1..=32"));
        }

        Ok(())
    }

    /// Builds a table that uses the given bucket matcher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is invalid.
    pub fn build<M: BucketMatcher>(self) -> crate::Result<CamHashTable<M>> {
        CamHashTable::new(self)
    }

    /// Builds a table that uses the lock-free [`AtomicBucketMatcher`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is invalid.
    pub fn open(self) -> crate::Result<CamHashTable<AtomicBucketMatcher>> {
        self.build()
    }
}

impl Encode for Config {
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let entries = u32::try_from(self.entries)
            .map_err(|_| Error::InvalidConfig("entries should fit into 32 bits"))?;

        let as_u8 = |value: usize| {
            u8::try_from(value).map_err(|_| Error::InvalidConfig("size should fit into 8 bits"))
        };

        writer.write_u32::<LE>(entries)?;
        writer.write_u8(as_u8(self.bucket_width)?)?;
        writer.write_u8(as_u8(self.key_size)?)?;
        writer.write_u8(as_u8(self.resolved_entry_size())?)?;
        writer.write_u8(self.tag_bits)?;
        writer.write_u8(self.hash_function.into())?;
        writer.write_u8(self.insert_policy.into())?;

        Ok(())
    }
}

impl Decode for Config {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let entries = reader.read_u32::<LE>()? as usize;
        let bucket_width = usize::from(reader.read_u8()?);
        let key_size = usize::from(reader.read_u8()?);
        let entry_size = usize::from(reader.read_u8()?);
        let tag_bits = reader.read_u8()?;
        let hash_function = HashFunction::try_from(reader.read_u8()?)?;
        let insert_policy = InsertPolicy::try_from(reader.read_u8()?)?;

        Ok(Self {
            entries,
            bucket_width,
            key_size,
            entry_size: Some(entry_size),
            tag_bits,
            hash_function,
            insert_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn config_default_is_valid() -> crate::Result<()> {
        Config::default().validate()?;
        Config::new(256).key_size(8).validate()?;
        Config::new(8).bucket_width(8).validate()?;
        Config::new(256).tag_bits(1).validate()?;
        Config::new(256).tag_bits(32).validate()?;
        Ok(())
    }

    #[test]
    fn config_rejects_bad_geometry() {
        for config in [
            Config::new(0),
            Config::new(100),
            Config::new(24).bucket_width(8),
            Config::new(256).bucket_width(0),
            Config::new(256).bucket_width(128),
        ] {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "{config:?} should be invalid",
            );
        }
    }

    #[test]
    fn config_rejects_bad_sizes() {
        for config in [
            Config::new(256).key_size(0),
            Config::new(256).key_size(6),
            Config::new(256).key_size(36),
            Config::new(256).key_size(16).entry_size(12),
            Config::new(256).key_size(16).entry_size(18),
            Config::new(256).key_size(16).entry_size(68),
            Config::new(256).tag_bits(0),
            Config::new(256).tag_bits(33),
        ] {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "{config:?} should be invalid",
            );
        }
    }

    #[test]
    fn config_entry_size_defaults_to_key_size() {
        assert_eq!(8, Config::new(256).key_size(8).resolved_entry_size());
        assert_eq!(
            16,
            Config::new(256).key_size(8).entry_size(16).resolved_entry_size(),
        );
    }

    #[test]
    fn config_serde_round_trip() -> crate::Result<()> {
        let config = Config::new(1_024)
            .bucket_width(4)
            .key_size(12)
            .entry_size(16)
            .tag_bits(20)
            .hash_function(HashFunction::Xxh3)
            .insert_policy(InsertPolicy::ConfirmKey);

        let bytes = config.encode_into_vec();
        assert_eq!(10, bytes.len());

        let decoded = Config::decode_from(&mut &bytes[..])?;
        assert_eq!(config, decoded);

        Ok(())
    }
}
