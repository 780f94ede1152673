use cam_hash::{Config, DigestPair};
use test_log::test;

#[test]
fn table_concrete_scenario() -> cam_hash::Result<()> {
    let table = Config::new(256).bucket_width(8).key_size(8).open()?;
    assert_eq!(32, table.bucket_count());

    let key = 0x0102_0304_0506_0708_u64.to_be_bytes();
    let probe = 0x0102_0304_0506_0709_u64.to_be_bytes();

    let (slot, inserted) = table.lookup_or_insert(&key)?;
    assert!(inserted);

    let (again, inserted) = table.lookup_or_insert(&key)?;
    assert!(!inserted);
    assert_eq!(slot, again);

    // Probed with the digest of the stored key, the tag hits but the key differs
    let digest = table.hash(&key);
    assert_eq!(Some(slot), table.lookup_index(&digest));
    assert_eq!(None, table.lookup_with_digest(&probe, &digest));

    // Looked up by its own digest it is absent as well
    assert_eq!(None, table.lookup(&probe));
    assert_eq!(Some(slot), table.lookup(&key));

    Ok(())
}

#[test]
fn table_precomputed_digest_round_trip() -> cam_hash::Result<()> {
    let table = Config::new(256).key_size(8).open()?;
    let key = *b"flow-001";

    let (slot, _) = table.lookup_or_insert(&key)?;

    // A digest can travel as a single u64 next to the key
    let raw = table.hash(&key).into_raw();
    assert_eq!(
        Some(slot),
        table.lookup_with_digest(&key, &DigestPair::from_raw(raw)),
    );

    Ok(())
}
