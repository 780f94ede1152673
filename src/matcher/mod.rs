// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Associative (CAM) match and insert on the buckets of a hash table
//!
//! The table never touches bucket memory itself; every tag read and
//! every tag claim goes through a [`BucketMatcher`]. The matcher is
//! responsible for making each operation atomic with respect to other
//! operations on the same bucket.

mod atomic;
mod locked;

pub use atomic::AtomicBucketMatcher;
pub use locked::LockedBucketMatcher;

use crate::tag::{Tag, FREE};

/// Result of a CAM insert
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CamInsert {
    /// The tag already existed at the given offset, nothing was modified
    Existing(usize),

    /// The tag was stored into the free slot at the given offset
    Inserted(usize),

    /// All slots are occupied by other tags
    Full,
}

/// Associative memory holding the tags of all buckets
///
/// Slots are addressed globally as `bucket * bucket_width + offset`.
/// A slot holding `0` is unoccupied. Occupied slots are never freed,
/// and inserts always claim the first free slot of a bucket, so the
/// occupied slots of a bucket form a prefix of it.
///
/// Implementations must guarantee that, for any single bucket:
///
/// - two concurrent inserts never claim the same slot,
/// - the same tag is never stored twice,
/// - a match observes the bucket either before or after an insert.
pub trait BucketMatcher: Send + Sync {
    /// Creates a matcher from raw slot words.
    ///
    /// `words.len()` must be a multiple of `bucket_width`.
    fn from_words(bucket_width: usize, words: Vec<u32>) -> Self
    where
        Self: Sized;

    /// Creates a matcher with all slots free.
    fn with_geometry(bucket_count: usize, bucket_width: usize) -> Self
    where
        Self: Sized,
    {
        Self::from_words(bucket_width, vec![FREE; bucket_count * bucket_width])
    }

    /// Number of slots per bucket.
    fn bucket_width(&self) -> usize;

    /// Total number of slots.
    fn capacity(&self) -> usize;

    /// Number of buckets.
    fn bucket_count(&self) -> usize {
        self.capacity() / self.bucket_width()
    }

    /// Searches the bucket for the tag, returning its offset in the bucket.
    fn cam_match(&self, bucket: usize, tag: Tag) -> Option<usize>;

    /// Searches the bucket for the tag, claiming the first free slot if it is absent.
    fn cam_insert(&self, bucket: usize, tag: Tag) -> CamInsert;

    /// Reads the raw word of a slot.
    ///
    /// Returns `0` for unoccupied and out-of-range slots.
    fn load(&self, slot: usize) -> u32;

    /// Number of occupied slots in the bucket.
    fn occupancy(&self, bucket: usize) -> usize {
        let width = self.bucket_width();

        (bucket * width..(bucket + 1) * width)
            .map(|slot| self.load(slot))
            .take_while(|&word| word != FREE)
            .count()
    }
}
