// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    config::Config,
    key_table::KeyTable,
    matcher::{AtomicBucketMatcher, BucketMatcher, CamInsert},
    tag::{Tag, FREE},
    DigestPair, Error, InsertPolicy,
};
use std::time::{Duration, Instant};

/// How long a [`InsertPolicy::ConfirmKey`] insert waits for a claimed record to be published
const PUBLISH_TIMEOUT: Duration = Duration::from_millis(100);

/// Global index of a slot, `bucket * bucket_width + offset`
///
/// The same index addresses the tag in the hash table and
/// the record in the key table.
pub type SlotIndex = usize;

/// Fixed-capacity, CAM-assisted hash table
///
/// The primary digest of a key selects a bucket, and a tag derived from
/// the secondary digest is matched associatively against the tags of that
/// bucket. A tag hit only yields a candidate slot; the key stored in the
/// key table at that slot confirms the match.
///
/// The table never grows and entries cannot be removed. All operations
/// take `&self`, so a table can be shared between threads; atomicity per
/// bucket is provided by the [`BucketMatcher`].
///
/// # Examples
///
/// ```
/// use cam_hash::Config;
///
/// let table = Config::new(256).key_size(8).open()?;
///
/// let (slot, inserted) = table.lookup_or_insert(b"abcdefgh")?;
/// assert!(inserted);
///
/// assert_eq!(Some(slot), table.lookup(b"abcdefgh"));
/// assert_eq!(None, table.lookup(b"abcdefgX"));
/// #
/// # Ok::<(), cam_hash::Error>(())
/// ```
pub struct CamHashTable<M: BucketMatcher = AtomicBucketMatcher> {
    config: Config,
    matcher: M,
    keys: KeyTable,
    bucket_mask: u32,
}

impl<M: BucketMatcher + std::fmt::Debug> std::fmt::Debug for CamHashTable<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CamHashTable")
            .field("config", &self.config)
            .field("matcher", &self.matcher)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl<M: BucketMatcher> CamHashTable<M> {
    /// Creates an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: Config) -> crate::Result<Self> {
        config.validate()?;

        let matcher = M::with_geometry(config.bucket_count(), config.bucket_width);
        let keys = KeyTable::new(config.entries, config.resolved_entry_size());

        Self::from_parts(config, matcher, keys)
    }

    pub(crate) fn from_parts(config: Config, matcher: M, keys: KeyTable) -> crate::Result<Self> {
        config.validate()?;

        let bucket_mask = u32::try_from(config.bucket_count() - 1)
            .map_err(|_| Error::InvalidConfig("entries should fit into 32 bits"))?;

        log::debug!(
            "Creating CAM hash table with {} buckets x {} slots, key_size={}B, entry_size={}B, tag_bits={}",
            config.bucket_count(),
            config.bucket_width,
            config.key_size,
            config.resolved_entry_size(),
            config.tag_bits,
        );

        Ok(Self {
            config,
            matcher,
            keys,
            bucket_mask,
        })
    }

    /// Returns the configuration of the table.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn matcher(&self) -> &M {
        &self.matcher
    }

    pub(crate) fn keys(&self) -> &KeyTable {
        &self.keys
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.entries
    }

    /// Number of buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.config.bucket_count()
    }

    /// Number of slots per bucket.
    #[must_use]
    pub fn bucket_width(&self) -> usize {
        self.config.bucket_width
    }

    /// Size of a key in bytes.
    #[must_use]
    pub fn key_size(&self) -> usize {
        self.config.key_size
    }

    /// Size of a key table record in bytes.
    #[must_use]
    pub fn entry_size(&self) -> usize {
        self.keys.entry_size()
    }

    /// Number of occupied slots.
    ///
    /// Scans the whole table.
    #[must_use]
    pub fn len(&self) -> usize {
        (0..self.bucket_count())
            .map(|bucket| self.matcher.occupancy(bucket))
            .sum()
    }

    /// Returns `true` if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        (0..self.bucket_count()).all(|bucket| self.matcher.occupancy(bucket) == 0)
    }

    /// Number of occupied slots in the bucket.
    #[must_use]
    pub fn bucket_occupancy(&self, bucket: usize) -> usize {
        if bucket < self.bucket_count() {
            self.matcher.occupancy(bucket)
        } else {
            0
        }
    }

    /// Returns the bucket a slot belongs to.
    #[must_use]
    pub fn bucket_of(&self, slot: SlotIndex) -> usize {
        slot / self.bucket_width()
    }

    /// Returns the position of a slot inside its bucket.
    #[must_use]
    pub fn offset_in_bucket(&self, slot: SlotIndex) -> usize {
        slot % self.bucket_width()
    }

    /// Returns the global index of a position inside a bucket.
    #[must_use]
    pub fn slot_index(&self, bucket: usize, offset: usize) -> SlotIndex {
        bucket * self.bucket_width() + offset
    }

    fn check_key(&self, key: &[u8]) {
        assert_eq!(
            self.config.key_size,
            key.len(),
            "key should be exactly {} bytes",
            self.config.key_size,
        );
    }

    /// Computes the digest pair of a key with the configured hash functions.
    ///
    /// # Panics
    ///
    /// Panics if the key does not have the configured key size.
    #[must_use]
    pub fn hash(&self, key: &[u8]) -> DigestPair {
        self.check_key(key);
        self.config.hash_function.digest(key)
    }

    /// Returns the bucket selected by a digest.
    #[must_use]
    pub fn bucket_index(&self, digest: &DigestPair) -> usize {
        (digest.primary & self.bucket_mask) as usize
    }

    /// Returns the tag derived from a digest.
    #[must_use]
    pub fn tag(&self, digest: &DigestPair) -> Tag {
        Tag::from_secondary(digest.secondary, self.config.tag_bits)
    }

    /// Returns the tag stored in a slot, if it is occupied.
    #[must_use]
    pub fn tag_at(&self, slot: SlotIndex) -> Option<Tag> {
        Tag::from_raw(self.matcher.load(slot))
    }

    /// Searches the bucket of the digest for its tag.
    ///
    /// The returned slot is only a candidate: the stored key is not compared,
    /// so distinct keys sharing bucket and tag are indistinguishable here.
    #[must_use]
    pub fn lookup_index(&self, digest: &DigestPair) -> Option<SlotIndex> {
        let bucket = self.bucket_index(digest);
        let offset = self.matcher.cam_match(bucket, self.tag(digest))?;
        Some(self.slot_index(bucket, offset))
    }

    /// Looks up a key, confirming the match against the key table.
    ///
    /// Returns `None` if the tag is absent, or if the key stored at the
    /// candidate slot differs from `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key does not have the configured key size.
    #[must_use]
    pub fn lookup(&self, key: &[u8]) -> Option<SlotIndex> {
        let digest = self.hash(key);
        self.lookup_with_digest(key, &digest)
    }

    /// Looks up a key using a precomputed digest.
    ///
    /// The digest should have been computed with [`CamHashTable::hash`].
    ///
    /// # Panics
    ///
    /// Panics if the key does not have the configured key size.
    #[must_use]
    pub fn lookup_with_digest(&self, key: &[u8], digest: &DigestPair) -> Option<SlotIndex> {
        self.check_key(key);

        let slot = self.lookup_index(digest)?;

        if self.keys.matches(slot, key) {
            Some(slot)
        } else {
            log::trace!("tag hit at slot {slot}, but stored key differs");
            None
        }
    }

    /// Searches the bucket of the digest for its tag, claiming a free slot
    /// if it is absent.
    ///
    /// Returns the slot and `true` if the slot was newly claimed. The key table
    /// is not touched; a caller that claims a slot here should publish its
    /// record with [`CamHashTable::publish_entry`]. Until it does, inserts of the
    /// same key under [`InsertPolicy::ConfirmKey`] fail with [`Error::PublishTimeout`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketFull`] if the tag is absent and every slot of the
    /// bucket is occupied.
    pub fn lookup_index_add(&self, digest: &DigestPair) -> crate::Result<(SlotIndex, bool)> {
        let bucket = self.bucket_index(digest);

        match self.matcher.cam_insert(bucket, self.tag(digest)) {
            CamInsert::Existing(offset) => Ok((self.slot_index(bucket, offset), false)),
            CamInsert::Inserted(offset) => Ok((self.slot_index(bucket, offset), true)),
            CamInsert::Full => {
                log::trace!("bucket {bucket} is full");
                Err(Error::BucketFull { bucket })
            }
        }
    }

    /// Looks up a key, inserting it if it is absent.
    ///
    /// Returns the slot and `true` if the key was newly inserted.
    /// The key is written into the key table only when it was inserted.
    ///
    /// Under [`InsertPolicy::TrustTag`], a tag match is reported as the existing
    /// entry without comparing keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketFull`] if the bucket has no room for the key,
    /// and [`Error::TagCollision`] if the policy is [`InsertPolicy::ConfirmKey`]
    /// and a different key owns the tag. Under [`InsertPolicy::ConfirmKey`],
    /// [`Error::PublishTimeout`] is returned if the record owning the tag is not
    /// published in time.
    ///
    /// [`Error::RecordConflict`] is returned if the record of the newly claimed
    /// slot was written through [`CamHashTable::publish_entry`] by someone else.
    ///
    /// # Panics
    ///
    /// Panics if the key does not have the configured key size.
    pub fn lookup_or_insert(&self, key: &[u8]) -> crate::Result<(SlotIndex, bool)> {
        self.insert_record(key, key)
    }

    /// Looks up the key at the start of `entry`, inserting the whole entry if it is absent.
    ///
    /// Only the leading key bytes are hashed and compared, the rest of the
    /// record is associated data.
    ///
    /// # Errors
    ///
    /// Same as [`CamHashTable::lookup_or_insert`].
    ///
    /// # Panics
    ///
    /// Panics if the entry does not have the configured entry size.
    pub fn insert_entry(&self, entry: &[u8]) -> crate::Result<(SlotIndex, bool)> {
        assert_eq!(
            self.entry_size(),
            entry.len(),
            "entry should be exactly {} bytes",
            self.entry_size(),
        );

        let key = entry.get(..self.config.key_size).unwrap_or_default();
        self.insert_record(key, entry)
    }

    fn insert_record(&self, key: &[u8], record: &[u8]) -> crate::Result<(SlotIndex, bool)> {
        let digest = self.hash(key);
        let (slot, inserted) = self.lookup_index_add(&digest)?;

        if inserted {
            self.write_claimed(slot, record)?;
        } else if self.config.insert_policy == InsertPolicy::ConfirmKey {
            self.wait_published(slot)?;

            if !self.keys.matches(slot, key) {
                log::trace!("tag collision at slot {slot}");
                return Err(Error::TagCollision { slot });
            }
        }

        Ok((slot, inserted))
    }

    /// Writes the record of a slot this context has just claimed.
    fn write_claimed(&self, slot: SlotIndex, record: &[u8]) -> crate::Result<()> {
        if self.keys.publish(slot, record) {
            Ok(())
        } else {
            log::trace!("record of claimed slot {slot} was written by another context");
            Err(Error::RecordConflict { slot })
        }
    }

    /// Waits for the context that claimed the slot to publish its record.
    fn wait_published(&self, slot: SlotIndex) -> crate::Result<()> {
        let mut spins = 0_u32;
        let mut deadline = None;

        while !self.keys.is_published(slot) {
            if spins < 64 {
                std::hint::spin_loop();
                spins += 1;
                continue;
            }

            let until = *deadline.get_or_insert_with(|| Instant::now() + PUBLISH_TIMEOUT);

            if Instant::now() >= until {
                log::trace!("record of slot {slot} was not published in time");
                return Err(Error::PublishTimeout { slot });
            }

            std::thread::yield_now();
        }

        Ok(())
    }

    /// Publishes the record of a slot claimed with [`CamHashTable::lookup_index_add`].
    ///
    /// Only the context that claimed the slot (i.e. observed `inserted == true`)
    /// may call this. A record written by anyone else makes a concurrent insert
    /// of the claiming context fail with [`Error::RecordConflict`].
    ///
    /// `entry` is zero-padded to the entry size. Returns `false` if the slot
    /// is not occupied, or its record was already written.
    ///
    /// # Panics
    ///
    /// Panics if the entry is not a multiple of 4 bytes or larger than the entry size.
    pub fn publish_entry(&self, slot: SlotIndex, entry: &[u8]) -> bool {
        assert!(
            entry.len().is_multiple_of(4) && entry.len() <= self.entry_size(),
            "entry should be a multiple of 4 bytes, at most {} bytes",
            self.entry_size(),
        );

        if self.matcher.load(slot) == FREE {
            return false;
        }

        self.keys.publish(slot, entry)
    }

    /// Copies the leading bytes of the record at a slot into `buf`.
    ///
    /// Returns `false` if the slot has no published record.
    pub fn read_entry(&self, slot: SlotIndex, buf: &mut [u8]) -> bool {
        self.keys.read(slot, buf)
    }

    /// Returns a copy of the record at a slot.
    #[must_use]
    pub fn entry(&self, slot: SlotIndex) -> Option<Vec<u8>> {
        let mut buf = vec![0; self.entry_size()];
        self.read_entry(slot, &mut buf).then_some(buf)
    }

    /// Returns a copy of the key stored at a slot.
    #[must_use]
    pub fn key_at(&self, slot: SlotIndex) -> Option<Vec<u8>> {
        let mut buf = vec![0; self.key_size()];
        self.read_entry(slot, &mut buf).then_some(buf)
    }
}
