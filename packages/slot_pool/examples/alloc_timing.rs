//! Times a loop of heap allocations against the same loop through a `SlotPool`.
//!
//! Each iteration allocates one value and immediately frees it again, so the pool only ever
//! touches its first slot while the global allocator goes through its general-purpose path.
//!
//! Pool creation and teardown are logged at debug level.

use std::hint::black_box;
use std::time::Instant;

use slot_pool::{DEFAULT_CAPACITY, SlotPool};
use tracing::Level;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let iterations = DEFAULT_CAPACITY.get();

    let mut pool = SlotPool::<i32>::new();

    let start = Instant::now();

    for _ in 0..iterations {
        drop(black_box(Box::new(0_i32)));
    }

    println!("Default allocator time: {:?}", start.elapsed());

    let start = Instant::now();

    for _ in 0..iterations {
        let item = pool
            .construct(black_box(0))
            .expect("the previous iteration released its slot");
        pool.destroy(item);
    }

    println!("Slot pool time: {:?}", start.elapsed());
}
