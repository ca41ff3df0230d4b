//! Compares allocating through a `SlotPool` with allocating through the global allocator.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use slot_pool::SlotPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = u64;
const TEST_VALUE: TestItem = 1024;

/// Enough slots to keep a batch of live items around without running out.
const BATCH_SIZE: usize = 1_000;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_vs_box");

    group.bench_function("box_new_drop", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(Box::new(black_box(TEST_VALUE))));
            }

            start.elapsed()
        });
    });

    group.bench_function("pool_construct_destroy", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::with_capacity(1);

            let start = Instant::now();

            for _ in 0..iters {
                let item = black_box(pool.construct(black_box(TEST_VALUE)).unwrap());
                pool.destroy(item);
            }

            start.elapsed()
        });
    });

    group.bench_function("pool_acquire_release", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::with_capacity(1);

            let start = Instant::now();

            for _ in 0..iters {
                let storage = black_box(pool.acquire().unwrap());

                // SAFETY: The storage came from this pool and holds no value.
                unsafe {
                    pool.release(storage);
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("box_batch", |b| {
        b.iter_custom(|iters| {
            let mut items = Vec::with_capacity(BATCH_SIZE);

            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..BATCH_SIZE {
                    items.push(Box::new(black_box(TEST_VALUE)));
                }

                items.clear();
            }

            start.elapsed()
        });
    });

    group.bench_function("pool_batch", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::with_capacity(BATCH_SIZE);
            let mut items = Vec::with_capacity(BATCH_SIZE);

            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..BATCH_SIZE {
                    items.push(pool.construct(black_box(TEST_VALUE)).unwrap());
                }

                for item in items.drain(..) {
                    pool.destroy(item);
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("build", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(SlotPool::<TestItem>::with_capacity(BATCH_SIZE)));
            }

            start.elapsed()
        });
    });

    group.finish();
}
