// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Checksummed images of a table
//!
//! An image lets another process (e.g. a host inspecting a device table)
//! restore the exact slot layout of a table:
//!
//! ```text
//! [magic] [config] [tag words] [records] [checksum]
//! ```
//!
//! - magic: 4 bytes
//! - config: see [`Config`]'s encoding
//! - tag words: one little endian `u32` per slot
//! - records: per slot, one byte (1 if the record is published) followed by the record
//! - checksum: XXH3-128 over everything before it, little endian

use crate::{
    checksum::{ChecksummedReader, ChecksummedWriter},
    coding::{Decode, DecodeError, Encode},
    config::Config,
    key_table::KeyTable,
    matcher::BucketMatcher,
    tag::{mask, FREE},
    CamHashTable, Checksum,
};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Write};

pub const MAGIC_BYTES: [u8; 4] = [b'C', b'A', b'M', 1];

/// Returns `true` if the bucket words can belong to a table with the given tag width.
fn is_valid_bucket(words: &[u32], tag_bits: u8) -> bool {
    let occupied = words.iter().take_while(|&&word| word != FREE).count();

    let (tags, rest) = words.split_at(occupied);

    if rest.iter().any(|&word| word != FREE) {
        return false;
    }

    tags.iter().enumerate().all(|(idx, &word)| {
        word & 1 == 1
            && word & !mask(tag_bits) == 0
            && !tags.iter().take(idx).any(|&other| other == word)
    })
}

impl<M: BucketMatcher> CamHashTable<M> {
    /// Writes an image of the table.
    ///
    /// Inserts that are still in flight while the image is written produce an
    /// image that fails to decode, so images should be taken of quiescent tables.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let words = (0..self.capacity())
            .map(|slot| self.matcher().load(slot))
            .collect::<Vec<_>>();

        let checksum = {
            let mut writer = ChecksummedWriter::new(&mut *writer);

            writer.write_all(&MAGIC_BYTES)?;
            self.config().encode_into(&mut writer)?;

            for &word in &words {
                writer.write_u32::<LE>(word)?;
            }

            let mut record = vec![0; self.entry_size()];

            for (slot, &word) in words.iter().enumerate() {
                let published = word != FREE && self.keys().read(slot, &mut record);

                if !published {
                    record.fill(0);
                }

                writer.write_u8(u8::from(published))?;
                writer.write_all(&record)?;
            }

            writer.checksum()
        };

        writer.write_u128::<LE>(checksum.into_u128())?;

        log::debug!(
            "Wrote image of CAM hash table with {} occupied slots",
            words.iter().filter(|&&word| word != FREE).count(),
        );

        Ok(())
    }

    /// Restores a table from an image.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, the image is malformed,
    /// or its checksum does not match.
    pub fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let mut protected_reader = ChecksummedReader::new(&mut *reader);

        let mut magic = [0u8; MAGIC_BYTES.len()];
        protected_reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            return Err(DecodeError::InvalidHeader("CamHashTable").into());
        }

        let config = Config::decode_from(&mut protected_reader)?;
        config.validate()?;

        let words = (0..config.entries)
            .map(|_| protected_reader.read_u32::<LE>())
            .collect::<std::io::Result<Vec<_>>>()?;

        for (bucket, bucket_words) in words.chunks_exact(config.bucket_width).enumerate() {
            if !is_valid_bucket(bucket_words, config.tag_bits) {
                return Err(DecodeError::InvalidBucket(bucket).into());
            }
        }

        let keys = KeyTable::new(config.entries, config.resolved_entry_size());
        let mut record = vec![0; config.resolved_entry_size()];

        for (slot, &word) in words.iter().enumerate() {
            let published = match protected_reader.read_u8()? {
                0 => false,
                1 => true,
                tag => return Err(DecodeError::InvalidTag(("RecordState", tag)).into()),
            };

            protected_reader.read_exact(&mut record)?;

            if published != (word != FREE) {
                return Err(DecodeError::InvalidRecord(slot).into());
            }

            if published {
                keys.publish(slot, &record);
            }
        }

        let got = protected_reader.checksum();
        let reader = protected_reader.into_inner();

        let expected = Checksum::from_raw(reader.read_u128::<LE>()?);
        got.check(expected)?;

        log::debug!(
            "Restored CAM hash table image with {} occupied slots",
            words.iter().filter(|&&word| word != FREE).count(),
        );

        let matcher = M::from_words(config.bucket_width, words);
        Self::from_parts(config, matcher, keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{matcher::LockedBucketMatcher, Error};
    use test_log::test;

    #[test]
    fn image_bucket_validation() {
        assert!(is_valid_bucket(&[0, 0, 0, 0], 24));
        assert!(is_valid_bucket(&[3, 5, 0, 0], 24));
        assert!(is_valid_bucket(&[3, 5, 7, 9], 24));

        // Hole in the occupied prefix
        assert!(!is_valid_bucket(&[3, 0, 5, 0], 24));

        // Duplicate tag
        assert!(!is_valid_bucket(&[3, 3, 0, 0], 24));

        // Bit 0 not set
        assert!(!is_valid_bucket(&[4, 0, 0, 0], 24));

        // Wider than the tag
        assert!(!is_valid_bucket(&[0x0100_0001, 0, 0, 0], 24));
        assert!(is_valid_bucket(&[0x0100_0001, 0, 0, 0], 32));
    }

    #[test]
    fn image_round_trip() -> crate::Result<()> {
        let table = Config::new(256).key_size(8).entry_size(12).open()?;

        let mut slots = vec![];

        for idx in 0..20_u32 {
            let mut entry = vec![];
            entry.extend_from_slice(&u64::from(idx).to_be_bytes());
            entry.extend_from_slice(&(idx * 10).to_le_bytes());

            slots.push(table.insert_entry(&entry)?.0);
        }

        let mut image = vec![];
        table.encode_into(&mut image)?;

        let restored = CamHashTable::<LockedBucketMatcher>::decode_from(&mut &image[..])?;
        assert_eq!(table.config(), restored.config());
        assert_eq!(table.len(), restored.len());

        for (idx, slot) in (0..20_u32).zip(slots) {
            let key = u64::from(idx).to_be_bytes();

            assert_eq!(Some(slot), restored.lookup(&key));
            assert_eq!(table.entry(slot), restored.entry(slot));
        }

        // The restored table keeps accepting inserts
        assert!(restored.lookup_or_insert(&999_u64.to_be_bytes())?.1);

        Ok(())
    }

    #[test]
    fn image_empty_table() -> crate::Result<()> {
        let table = Config::new(8).key_size(4).open()?;

        let mut image = vec![];
        table.encode_into(&mut image)?;

        let restored = CamHashTable::<crate::AtomicBucketMatcher>::decode_from(&mut &image[..])?;
        assert!(restored.is_empty());

        Ok(())
    }

    #[test]
    fn image_bad_magic() -> crate::Result<()> {
        let table = Config::new(8).key_size(4).open()?;

        let mut image = vec![];
        table.encode_into(&mut image)?;

        if let Some(byte) = image.first_mut() {
            *byte = b'X';
        }

        assert!(matches!(
            CamHashTable::<crate::AtomicBucketMatcher>::decode_from(&mut &image[..]),
            Err(Error::Decode(DecodeError::InvalidHeader("CamHashTable"))),
        ));

        Ok(())
    }

    #[test]
    fn image_checksum_mismatch() -> crate::Result<()> {
        let table = Config::new(8).key_size(4).open()?;
        table.lookup_or_insert(b"abcd")?;

        let mut image = vec![];
        table.encode_into(&mut image)?;

        // Flip a bit in the stored key
        let offset = MAGIC_BYTES.len() + 10 + 8 * 4 + 1;

        if let Some(byte) = image.get_mut(offset) {
            *byte ^= 1;
        }

        let result = CamHashTable::<crate::AtomicBucketMatcher>::decode_from(&mut &image[..]);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));

        Ok(())
    }

    #[test]
    fn image_truncated() -> crate::Result<()> {
        let table = Config::new(8).key_size(4).open()?;

        let mut image = vec![];
        table.encode_into(&mut image)?;
        image.truncate(image.len() - 1);

        assert!(matches!(
            CamHashTable::<crate::AtomicBucketMatcher>::decode_from(&mut &image[..]),
            Err(Error::Io(_)),
        ));

        Ok(())
    }
}
