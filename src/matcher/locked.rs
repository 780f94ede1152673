// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{BucketMatcher, CamInsert};
use crate::tag::{Tag, FREE};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Bucket-granular CAM
///
/// Models a memory engine that executes CAM operations on a whole bucket
/// as one unit: every bucket sits behind its own lock, and an operation
/// reads and updates all of its words while holding it. Operations on
/// different buckets never contend.
///
/// This is also the shape to follow when putting real associative memory
/// behind [`BucketMatcher`].
pub struct LockedBucketMatcher {
    buckets: Box<[Mutex<Box<[u32]>>]>,
    bucket_width: usize,
}

impl std::fmt::Debug for LockedBucketMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedBucketMatcher")
            .field("bucket_count", &self.buckets.len())
            .field("bucket_width", &self.bucket_width)
            .finish_non_exhaustive()
    }
}

impl LockedBucketMatcher {
    fn lock(&self, bucket: usize) -> Option<MutexGuard<'_, Box<[u32]>>> {
        // NOTE: No operation can panic while holding the lock,
        // so a poisoned bucket is still consistent
        self.buckets
            .get(bucket)
            .map(|words| words.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl BucketMatcher for LockedBucketMatcher {
    fn from_words(bucket_width: usize, words: Vec<u32>) -> Self {
        assert!(bucket_width > 0, "bucket width may not be 0");
        assert!(
            words.len().is_multiple_of(bucket_width),
            "slot count should be a multiple of the bucket width",
        );

        Self {
            buckets: words
                .chunks_exact(bucket_width)
                .map(|bucket| Mutex::new(Box::from(bucket)))
                .collect(),
            bucket_width,
        }
    }

    fn bucket_width(&self) -> usize {
        self.bucket_width
    }

    fn capacity(&self) -> usize {
        self.buckets.len() * self.bucket_width
    }

    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn cam_match(&self, bucket: usize, tag: Tag) -> Option<usize> {
        let words = self.lock(bucket)?;
        words.iter().position(|&word| word == tag.get())
    }

    fn cam_insert(&self, bucket: usize, tag: Tag) -> CamInsert {
        // NOTE: Bucket indices are masked by the table, so they are always in range
        let Some(mut words) = self.lock(bucket) else {
            return CamInsert::Full;
        };

        let needle = tag.get();

        for (offset, word) in words.iter_mut().enumerate() {
            if *word == needle {
                return CamInsert::Existing(offset);
            }

            if *word == FREE {
                *word = needle;
                return CamInsert::Inserted(offset);
            }
        }

        CamInsert::Full
    }

    fn load(&self, slot: usize) -> u32 {
        let bucket = slot / self.bucket_width;
        let offset = slot % self.bucket_width;

        self.lock(bucket)
            .and_then(|words| words.get(offset).copied())
            .unwrap_or(FREE)
    }

    fn occupancy(&self, bucket: usize) -> usize {
        self.lock(bucket)
            .map_or(0, |words| words.iter().take_while(|&&word| word != FREE).count())
    }
}
