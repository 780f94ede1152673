use cam_hash::{Config, InsertPolicy};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;

const ENTRIES: usize = 1 << 16;
const KEYS: u64 = 16_384;

fn insert(c: &mut Criterion) {
    for policy in [InsertPolicy::TrustTag, InsertPolicy::ConfirmKey] {
        c.bench_function(&format!("insert {KEYS} keys ({policy:?})"), |b| {
            b.iter_batched(
                || {
                    Config::new(ENTRIES)
                        .key_size(8)
                        .insert_policy(policy)
                        .open()
                        .unwrap()
                },
                |table| {
                    for idx in 0..KEYS {
                        table.lookup_or_insert(&idx.to_be_bytes()).unwrap();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }

    let table = Config::new(ENTRIES).key_size(8).open().unwrap();

    for idx in 0..KEYS {
        table.lookup_or_insert(&idx.to_be_bytes()).unwrap();
    }

    c.bench_function("insert existing key", |b| {
        let key = 42_u64.to_be_bytes();
        b.iter(|| table.lookup_or_insert(&key).unwrap());
    });
}

fn insert_concurrent(c: &mut Criterion) {
    for threads in [2, 4, 8] {
        c.bench_function(&format!("insert {KEYS} keys ({threads} threads)"), |b| {
            b.iter_batched(
                || Arc::new(Config::new(ENTRIES).key_size(8).open().unwrap()),
                |table| {
                    std::thread::scope(|scope| {
                        for thread in 0..threads {
                            let table = &table;

                            scope.spawn(move || {
                                for idx in (thread..KEYS).step_by(threads as usize) {
                                    table.lookup_or_insert(&idx.to_be_bytes()).unwrap();
                                }
                            });
                        }
                    });
                },
                BatchSize::LargeInput,
            );
        });
    }
}

criterion_group!(benches, insert, insert_concurrent);
criterion_main!(benches);
