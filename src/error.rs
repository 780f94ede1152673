// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{coding::DecodeError, Checksum};

/// Represents errors that can occur in the CAM hash table
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Deserialization of a table image failed
    Decode(DecodeError),

    /// Invalid checksum value
    ChecksumMismatch {
        /// Checksum of the data that was read
        got: Checksum,

        /// Checksum that was stored alongside the data
        expected: Checksum,
    },

    /// Every slot of the bucket is occupied by a non-matching tag
    ///
    /// This is a capacity exhaustion of that one bucket. No other bucket is tried.
    BucketFull {
        /// Index of the exhausted bucket
        bucket: usize,
    },

    /// The tag matched an existing slot, but the stored key differs
    ///
    /// Only reported when inserting with [`InsertPolicy::ConfirmKey`](crate::InsertPolicy::ConfirmKey).
    TagCollision {
        /// Slot holding the colliding key
        slot: usize,
    },

    /// The tag matched a slot whose record was not published in time
    ///
    /// The slot was claimed, but the claiming context has not written its
    /// record, so the stored key cannot be compared.
    /// Only reported when inserting with [`InsertPolicy::ConfirmKey`](crate::InsertPolicy::ConfirmKey).
    PublishTimeout {
        /// Slot holding the unpublished record
        slot: usize,
    },

    /// The record of a newly claimed slot was already written by another context
    ///
    /// See [`CamHashTable::publish_entry`](crate::CamHashTable::publish_entry).
    RecordConflict {
        /// Slot whose record was taken over
        slot: usize,
    },

    /// The table geometry or key/entry sizes are not supported
    InvalidConfig(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CamHashError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Table result
pub type Result<T> = std::result::Result<T, Error>;
