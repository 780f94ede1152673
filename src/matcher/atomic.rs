// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{BucketMatcher, CamInsert};
use crate::tag::{Tag, FREE};
use std::sync::atomic::{
    AtomicU32,
    Ordering::{AcqRel, Acquire},
};

/// Lock-free software CAM
///
/// Each slot is an [`AtomicU32`]. Matching is a linear scan over the
/// occupied prefix of a bucket. Inserting claims the first free slot
/// with a compare-and-swap; if the swap loses against another insert,
/// the winner's tag is compared before moving on to the next slot, so
/// the same tag can never end up in a bucket twice.
pub struct AtomicBucketMatcher {
    slots: Box<[AtomicU32]>,
    bucket_width: usize,
}

impl std::fmt::Debug for AtomicBucketMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicBucketMatcher")
            .field("capacity", &self.slots.len())
            .field("bucket_width", &self.bucket_width)
            .finish_non_exhaustive()
    }
}

impl AtomicBucketMatcher {
    fn bucket(&self, bucket: usize) -> &[AtomicU32] {
        let start = bucket * self.bucket_width;
        let end = start + self.bucket_width;

        debug_assert!(end <= self.slots.len(), "bucket out of bounds");

        // NOTE: Bucket indices are masked by the table, so they are always in range
        self.slots.get(start..end).unwrap_or_default()
    }
}

impl BucketMatcher for AtomicBucketMatcher {
    fn from_words(bucket_width: usize, words: Vec<u32>) -> Self {
        assert!(bucket_width > 0, "bucket width may not be 0");
        assert!(
            words.len().is_multiple_of(bucket_width),
            "slot count should be a multiple of the bucket width",
        );

        Self {
            slots: words.into_iter().map(AtomicU32::new).collect(),
            bucket_width,
        }
    }

    fn bucket_width(&self) -> usize {
        self.bucket_width
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn cam_match(&self, bucket: usize, tag: Tag) -> Option<usize> {
        let needle = tag.get();

        self.bucket(bucket)
            .iter()
            .map(|slot| slot.load(Acquire))
            .take_while(|&word| word != FREE)
            .position(|word| word == needle)
    }

    fn cam_insert(&self, bucket: usize, tag: Tag) -> CamInsert {
        let needle = tag.get();

        for (offset, slot) in self.bucket(bucket).iter().enumerate() {
            let word = slot.load(Acquire);

            if word == needle {
                return CamInsert::Existing(offset);
            }

            if word == FREE {
                match slot.compare_exchange(FREE, needle, AcqRel, Acquire) {
                    Ok(_) => return CamInsert::Inserted(offset),
                    Err(winner) if winner == needle => return CamInsert::Existing(offset),
                    Err(_) => {}
                }
            }
        }

        CamInsert::Full
    }

    fn load(&self, slot: usize) -> u32 {
        self.slots.get(slot).map_or(FREE, |word| word.load(Acquire))
    }
}
