// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A fixed-capacity, CAM-assisted hash table for exact-match lookups.
//!
//! ##### About
//!
//! This crate exports a [`CamHashTable`], a two-level hash index of the kind
//! used by network processors to turn a large key (e.g. a flow 5-tuple) into a
//! compact slot index in a bounded number of memory operations.
//!
//! Every key gets two independent 32-bit digests. The primary digest selects a
//! bucket of `B` slots, the secondary digest is truncated into a compact *tag*
//! which is matched against all tags of that bucket at once (the "CAM" step).
//! A tag hit yields a candidate slot; the full key, stored in a key table at
//! the same index, confirms or rejects the match.
//!
//! The table is allocated once and never grows. There is no deletion: a slot,
//! once claimed, stays claimed. Each bucket holds at most `B` keys, inserting
//! into a full bucket fails with [`Error::BucketFull`] instead of spilling into
//! other buckets.
//!
//! The associative match is pluggable through [`BucketMatcher`]. The default,
//! [`AtomicBucketMatcher`], is lock-free; [`LockedBucketMatcher`] serializes
//! operations per bucket.
//!
//! # Example usage
//!
//! ```
//! use cam_hash::{Config, Error};
//!
//! // 32 buckets of 8 slots each, 8-byte keys
//! let table = Config::new(256).key_size(8).open()?;
//!
//! let key = 0x0102_0304_0506_0708_u64.to_be_bytes();
//!
//! let (slot, inserted) = table.lookup_or_insert(&key)?;
//! assert!(inserted);
//!
//! // Inserting again finds the existing slot
//! assert_eq!((slot, false), table.lookup_or_insert(&key)?);
//!
//! assert_eq!(Some(slot), table.lookup(&key));
//! #
//! # Ok::<(), Error>(())
//! ```

#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::redundant_feature_names)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod checksum;
mod coding;

/// Configuration
pub mod config;

mod error;
mod hash;
mod image;
mod key_table;

pub mod matcher;

mod table;
mod tag;

pub use {
    checksum::Checksum,
    coding::DecodeError,
    config::{Config, InsertPolicy, MAX_ENTRY_SIZE, MAX_KEY_SIZE},
    error::{Error, Result},
    hash::{compute_digests, DigestPair, HashFunction},
    matcher::{AtomicBucketMatcher, BucketMatcher, CamInsert, LockedBucketMatcher},
    table::{CamHashTable, SlotIndex},
    tag::Tag,
};
