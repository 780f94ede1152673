use cam_hash::{compute_digests, Config, HashFunction, LockedBucketMatcher};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

const ENTRIES: usize = 1 << 20;
const KEYS: u64 = 500_000;

fn digest(c: &mut Criterion) {
    let key = *b"10.0.0.1:8080->10.0.0.2:443/tcp_";

    c.bench_function("digest crc pair (32 byte key)", |b| {
        b.iter(|| compute_digests(&key));
    });

    c.bench_function("digest xxh3 pair (32 byte key)", |b| {
        b.iter(|| HashFunction::Xxh3.digest(&key));
    });
}

fn lookup(c: &mut Criterion) {
    let table = Config::new(ENTRIES).key_size(8).open().unwrap();

    for idx in 0..KEYS {
        table.lookup_or_insert(&idx.to_be_bytes()).unwrap();
    }

    let mut rng = rand::rng();

    c.bench_function("lookup, hit", |b| {
        b.iter(|| {
            let key = rng.random_range(0..KEYS).to_be_bytes();
            assert!(table.lookup(&key).is_some());
        });
    });

    c.bench_function("lookup, miss", |b| {
        b.iter(|| {
            let key = rng.random_range(KEYS..KEYS * 2).to_be_bytes();
            assert!(table.lookup(&key).is_none());
        });
    });

    c.bench_function("lookup index only", |b| {
        b.iter(|| {
            let key = rng.random_range(0..KEYS).to_be_bytes();
            table.lookup_index(&table.hash(&key))
        });
    });

    let locked = Config::new(ENTRIES)
        .key_size(8)
        .build::<LockedBucketMatcher>()
        .unwrap();

    for idx in 0..KEYS {
        locked.lookup_or_insert(&idx.to_be_bytes()).unwrap();
    }

    c.bench_function("lookup, hit (locked buckets)", |b| {
        b.iter(|| {
            let key = rng.random_range(0..KEYS).to_be_bytes();
            assert!(locked.lookup(&key).is_some());
        });
    });
}

criterion_group!(benches, digest, lookup);
criterion_main!(benches);
