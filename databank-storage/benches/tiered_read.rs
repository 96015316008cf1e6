use criterion::{criterion_group, criterion_main, Criterion};
use databank_storage::{Driver, Entry, MemoryDriver, SyncDriver};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn two_tiers() -> (Arc<MemoryDriver>, Arc<MemoryDriver>, SyncDriver) {
    let front = Arc::new(MemoryDriver::new());
    let back = Arc::new(MemoryDriver::new());
    let sync = SyncDriver::new(vec![front.clone() as Arc<dyn Driver>, back.clone()])
        .expect("two tiers");
    (front, back, sync)
}

fn bench_tiered_read(c: &mut Criterion) {
    let entry = Entry::new("session:42", Duration::ZERO).with_content(vec![7u8; 512]);

    let (_, _, warm) = two_tiers();
    warm.write(&entry).expect("seed");
    c.bench_function("sync/read_front_hit", |b| {
        b.iter(|| black_box(warm.read(black_box("session:42"))));
    });

    let (front, back, cold) = two_tiers();
    back.write(&entry).expect("seed");
    c.bench_function("sync/read_fill_back", |b| {
        b.iter(|| {
            front.delete("session:42").expect("evict");
            black_box(cold.read(black_box("session:42")))
        });
    });

    let (_, _, empty) = two_tiers();
    c.bench_function("sync/read_miss", |b| {
        b.iter(|| black_box(empty.read(black_box("absent"))));
    });
}

fn bench_tiered_write(c: &mut Criterion) {
    let (_, _, sync) = two_tiers();
    let entry = Entry::new("session:42", Duration::ZERO).with_content(vec![7u8; 512]);

    c.bench_function("sync/write_overwrite", |b| {
        b.iter(|| black_box(sync.write(black_box(&entry))));
    });
}

criterion_group!(benches, bench_tiered_read, bench_tiered_write);
criterion_main!(benches);
