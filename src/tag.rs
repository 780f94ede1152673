// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::num::NonZeroU32;

/// Raw value of a slot that holds no tag
pub const FREE: u32 = 0;

/// Compact tag stored in a bucket slot
///
/// A tag is the secondary digest truncated to a fixed number of bits,
/// with bit 0 always set. Because of that a tag is never `0`,
/// which is reserved to mark free slots.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Tag(NonZeroU32);

impl Tag {
    /// Derives the tag of a secondary digest, keeping `bits` low bits.
    #[must_use]
    pub fn from_secondary(secondary: u32, bits: u8) -> Self {
        debug_assert!((1..=32).contains(&bits), "invalid tag width");
        Self(NonZeroU32::MIN | (secondary & mask(bits)))
    }

    /// Interprets a raw slot value, returning `None` for a free slot.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw value as stored in the bucket.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Returns the mask that keeps the lowest `bits` bits.
#[must_use]
pub fn mask(bits: u8) -> u32 {
    u32::MAX.checked_shr(32 - u32::from(bits.min(32))).unwrap_or(0)
}
