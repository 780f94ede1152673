// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use byteorder::{LittleEndian, ReadBytesExt};
use std::sync::atomic::{
    AtomicU32, AtomicU8,
    Ordering::{Acquire, Relaxed, Release},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const PUBLISHED: u8 = 2;

/// Fixed-size records, index-aligned with the slots of the hash table
///
/// Records are stored as 32-bit words. Each record is written at most once:
/// the writer takes ownership of the record, stores its words and then
/// publishes it. Readers only ever look at published records, so they see
/// either nothing or the complete record.
pub struct KeyTable {
    words: Box<[AtomicU32]>,
    states: Box<[AtomicU8]>,
    words_per_record: usize,
}

impl std::fmt::Debug for KeyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTable")
            .field("capacity", &self.states.len())
            .field("entry_size", &self.entry_size())
            .finish_non_exhaustive()
    }
}

impl KeyTable {
    /// Allocates `entries` empty records of `entry_size` bytes.
    #[must_use]
    pub fn new(entries: usize, entry_size: usize) -> Self {
        assert!(entry_size.is_multiple_of(4), "entry size should be a multiple of 4");

        let words_per_record = entry_size / 4;

        Self {
            words: (0..entries * words_per_record)
                .map(|_| AtomicU32::new(0))
                .collect(),
            states: (0..entries).map(|_| AtomicU8::new(EMPTY)).collect(),
            words_per_record,
        }
    }

    /// Size of a record in bytes.
    #[must_use]
    pub fn entry_size(&self) -> usize {
        self.words_per_record * 4
    }

    fn record(&self, slot: usize) -> Option<&[AtomicU32]> {
        let start = slot.checked_mul(self.words_per_record)?;
        self.words.get(start..start.checked_add(self.words_per_record)?)
    }

    /// Writes `bytes` into the record, zero-padding it, then publishes it.
    ///
    /// Returns `false` if the record is out of range or was already written.
    pub fn publish(&self, slot: usize, bytes: &[u8]) -> bool {
        debug_assert!(bytes.len().is_multiple_of(4), "record data should be word aligned");
        debug_assert!(bytes.len() <= self.entry_size(), "record data is too large");

        let (Some(record), Some(state)) = (self.record(slot), self.states.get(slot)) else {
            return false;
        };

        if state
            .compare_exchange(EMPTY, WRITING, Acquire, Relaxed)
            .is_err()
        {
            return false;
        }

        let mut reader = bytes;

        for word in record {
            word.store(reader.read_u32::<LittleEndian>().unwrap_or(0), Relaxed);
        }

        state.store(PUBLISHED, Release);

        true
    }

    /// Returns `true` if the record has been completely written.
    #[must_use]
    pub fn is_published(&self, slot: usize) -> bool {
        self.states
            .get(slot)
            .is_some_and(|state| state.load(Acquire) == PUBLISHED)
    }

    /// Copies the leading bytes of a published record into `buf`.
    ///
    /// Returns `false` if the record is not published.
    pub fn read(&self, slot: usize, buf: &mut [u8]) -> bool {
        if !self.is_published(slot) {
            return false;
        }

        let Some(record) = self.record(slot) else {
            return false;
        };

        for (chunk, word) in buf.chunks_mut(4).zip(record) {
            for (dst, src) in chunk.iter_mut().zip(word.load(Relaxed).to_le_bytes()) {
                *dst = src;
            }
        }

        true
    }

    /// Returns `true` if the record is published and starts with `key`.
    #[must_use]
    pub fn matches(&self, slot: usize, key: &[u8]) -> bool {
        if key.len() > self.entry_size() || !self.is_published(slot) {
            return false;
        }

        let Some(record) = self.record(slot) else {
            return false;
        };

        key.chunks(4)
            .zip(record)
            .all(|(chunk, word)| word.load(Relaxed).to_le_bytes().starts_with(chunk))
    }
}
