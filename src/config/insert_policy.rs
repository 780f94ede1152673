// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::DecodeError;

/// What an insert does when the tag of its key is already present
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum InsertPolicy {
    /// A tag match is reported as the existing entry, without reading the key table.
    ///
    /// Two distinct keys that share both bucket and tag are treated as the same
    /// entry, so the tag width should make such collisions negligible for the
    /// expected key population.
    #[default]
    TrustTag,

    /// A tag match is confirmed against the stored key.
    ///
    /// If the stored key differs, the insert fails with
    /// [`Error::TagCollision`](crate::Error::TagCollision).
    ConfirmKey,
}

impl From<InsertPolicy> for u8 {
    fn from(value: InsertPolicy) -> Self {
        match value {
            InsertPolicy::TrustTag => 0,
            InsertPolicy::ConfirmKey => 1,
        }
    }
}

impl TryFrom<u8> for InsertPolicy {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::TrustTag),
            1 => Ok(Self::ConfirmKey),
            _ => Err(DecodeError::InvalidTag(("InsertPolicy", value))),
        }
    }
}
