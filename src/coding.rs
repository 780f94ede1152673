// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Read, Write};

/// Error during deserialization of a table image
#[derive(Debug)]
pub enum DecodeError {
    /// Invalid header, e.g. bad magic bytes
    InvalidHeader(&'static str),

    /// Invalid enum tag
    InvalidTag((&'static str, u8)),

    /// Bucket contents break the table invariants
    ///
    /// Tags must have their lowest bit set, be unique within a bucket
    /// and occupy a prefix of the bucket.
    InvalidBucket(usize),

    /// Key table record disagrees with the occupancy of its slot
    InvalidRecord(usize),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecodeError({self:?})")
    }
}

impl std::error::Error for DecodeError {}

/// Trait to serialize stuff
pub trait Encode {
    /// Serializes into writer.
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()>;

    /// Serializes into vector.
    #[allow(unused)]
    #[expect(clippy::expect_used, reason = "writing into a Vec cannot fail")]
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut v = vec![];
        self.encode_into(&mut v).expect("cannot fail");
        v
    }
}

/// Trait to deserialize stuff
pub trait Decode {
    /// Deserializes from reader.
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self>
    where
        Self: Sized;
}
