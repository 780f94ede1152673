use cam_hash::{CamHashTable, Config, Error, Tag};
use test_log::test;

/// Finds `n` keys that land in `bucket` with pairwise distinct tags.
fn keys_in_bucket(table: &CamHashTable, bucket: usize, n: usize) -> Vec<[u8; 8]> {
    let mut keys = vec![];
    let mut tags: Vec<Tag> = vec![];

    for idx in 0_u64.. {
        if keys.len() == n {
            break;
        }

        let key = idx.to_le_bytes();
        let digest = table.hash(&key);
        let tag = table.tag(&digest);

        if table.bucket_index(&digest) == bucket && !tags.contains(&tag) {
            keys.push(key);
            tags.push(tag);
        }
    }

    keys
}

#[test]
fn table_capacity_boundary() -> cam_hash::Result<()> {
    let table = Config::new(256).key_size(8).open()?;
    let keys = keys_in_bucket(&table, 5, 9);

    for key in keys.iter().take(8) {
        let (slot, inserted) = table.lookup_or_insert(key)?;
        assert!(inserted);
        assert_eq!(5, table.bucket_of(slot));
    }

    assert_eq!(8, table.bucket_occupancy(5));

    let Some(overflow) = keys.last() else {
        panic!("should have found 9 keys");
    };

    assert!(matches!(
        table.lookup_or_insert(overflow),
        Err(Error::BucketFull { bucket: 5 }),
    ));
    assert_eq!(None, table.lookup(overflow));

    // Keys already in the full bucket are still found
    for key in keys.iter().take(8) {
        assert!(table.lookup(key).is_some());
        assert!(!table.lookup_or_insert(key)?.1);
    }

    Ok(())
}

#[test]
fn table_full_bucket_isolation() -> cam_hash::Result<()> {
    let table = Config::new(256).key_size(8).open()?;

    for key in keys_in_bucket(&table, 0, 8) {
        table.lookup_or_insert(&key)?;
    }

    for bucket in 1..table.bucket_count() {
        for key in keys_in_bucket(&table, bucket, 3) {
            let (slot, inserted) = table.lookup_or_insert(&key)?;

            assert!(inserted);
            assert_eq!(bucket, table.bucket_of(slot));
            assert_eq!(Some(slot), table.lookup(&key));
        }
    }

    assert_eq!(8 + 31 * 3, table.len());

    Ok(())
}

#[test]
fn table_single_slot_buckets() -> cam_hash::Result<()> {
    let table = Config::new(16).bucket_width(1).key_size(4).open()?;
    assert_eq!(16, table.bucket_count());

    let mut full = 0;

    for idx in 0..64_u32 {
        match table.lookup_or_insert(&idx.to_le_bytes()) {
            Ok(_) => {}
            Err(Error::BucketFull { .. }) => full += 1,
            Err(e) => return Err(e),
        }
    }

    assert!(full > 0);
    assert!(table.len() <= 16);

    Ok(())
}
