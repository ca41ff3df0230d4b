//! Integration tests for the `slot_pool` package.
//!
//! These exercise the public contract: capacity bounds, most-recently-released-first reuse of
//! slots and the construct/destroy round trip.

use std::cell::RefCell;
use std::collections::HashSet;
use std::num::NonZero;
use std::rc::Rc;
use std::thread;

use slot_pool::{DEFAULT_CAPACITY, DropPolicy, Error, Pooled, SlotPool};

#[test]
fn capacity_bound_on_raw_acquire() {
    let mut pool = SlotPool::<u32>::with_capacity(10);

    let slots: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();

    assert!(pool.is_full());
    assert_eq!(pool.acquire(), Err(Error::OutOfCapacity { capacity: 10 }));

    for slot in slots {
        // SAFETY: Every slot came from this pool and holds no value.
        unsafe {
            pool.release(slot);
        }
    }

    assert!(pool.is_empty());
}

#[test]
fn end_to_end_capacity_two() {
    let mut pool = SlotPool::<i32>::with_capacity(2);

    let p1 = pool.construct(5).unwrap();
    assert_eq!(*p1, 5);

    let p2 = pool.construct(7).unwrap();
    assert_eq!(*p2, 7);

    assert!(matches!(
        pool.construct(9),
        Err(Error::OutOfCapacity { capacity: 2 })
    ));

    let p1_addr = p1.ptr();
    pool.destroy(p1);

    let p3 = pool.construct(9).unwrap();
    assert_eq!(p3.ptr(), p1_addr);
    assert_eq!(*p3, 9);
    assert_eq!(*p2, 7);

    pool.destroy(p2);
    pool.destroy(p3);
}

#[test]
fn reuse_is_most_recently_released_first() {
    let mut pool = SlotPool::<char>::with_capacity(3);

    let a = pool.construct('A').unwrap();
    let b = pool.construct('B').unwrap();
    let c = pool.construct('C').unwrap();

    let a_addr = a.ptr();
    let b_addr = b.ptr();

    pool.destroy(b);
    pool.destroy(a);

    let d = pool.construct('D').unwrap();
    let e = pool.construct('E').unwrap();

    assert_eq!(d.ptr(), a_addr);
    assert_eq!(e.ptr(), b_addr);
    assert_eq!((*c, *d, *e), ('C', 'D', 'E'));

    pool.destroy(c);
    pool.destroy(d);
    pool.destroy(e);
}

#[test]
fn only_released_slots_are_reused() {
    let mut pool = SlotPool::<u64>::with_capacity(4);

    let mut items: Vec<Option<Pooled<u64>>> =
        (1..=4).map(|i| Some(pool.construct(i).unwrap())).collect();

    let addresses: Vec<_> = items
        .iter()
        .map(|item| item.as_ref().unwrap().ptr())
        .collect();

    pool.destroy(items[1].take());
    pool.destroy(items[2].take());

    let first = pool.construct(50).unwrap();
    let second = pool.construct(60).unwrap();

    assert_eq!(first.ptr(), addresses[2]);
    assert_eq!(second.ptr(), addresses[1]);

    assert_eq!(**items[0].as_ref().unwrap(), 1);
    assert_eq!(**items[3].as_ref().unwrap(), 4);
    assert!(pool.is_full());

    pool.destroy(first);
    pool.destroy(second);
    for item in items {
        pool.destroy(item);
    }

    assert!(pool.is_empty());
}

#[test]
fn construct_destroy_round_trip_is_invisible() {
    let mut pool = SlotPool::<String>::with_capacity(3);

    let kept = pool.construct("kept".to_string()).unwrap();

    // Where the next two constructions land before the round trip...
    let probe_a = pool.construct("a".to_string()).unwrap();
    let probe_b = pool.construct("b".to_string()).unwrap();
    let expected = (probe_a.ptr(), probe_b.ptr());
    pool.destroy(probe_b);
    pool.destroy(probe_a);

    let round_trip = pool.construct("temporary".to_string()).unwrap();
    pool.destroy(round_trip);

    // ...is exactly where they land after it.
    let probe_a = pool.construct("a".to_string()).unwrap();
    let probe_b = pool.construct("b".to_string()).unwrap();
    assert_eq!((probe_a.ptr(), probe_b.ptr()), expected);
    assert_eq!(pool.len(), 3);

    pool.destroy(kept);
    pool.destroy(probe_a);
    pool.destroy(probe_b);
}

#[test]
fn sequential_acquisitions_never_alias() {
    let mut pool = SlotPool::<[u8; 24]>::with_capacity(128);

    let items: Vec<_> = (0..128_u8)
        .map(|i| pool.construct([i; 24]).unwrap())
        .collect();

    let addresses: HashSet<_> = items.iter().map(|item| item.ptr()).collect();
    assert_eq!(addresses.len(), items.len());

    for (i, item) in (0..128_u8).zip(&items) {
        assert!(item.iter().all(|&byte| byte == i));
    }

    for item in items {
        pool.destroy(item);
    }
}

#[test]
fn default_capacity_full_cycle() {
    let mut pool = SlotPool::<usize>::new();
    let capacity = DEFAULT_CAPACITY.get();

    let items: Vec<_> = (0..capacity).map(|i| pool.construct(i).unwrap()).collect();

    assert!(pool.is_full());
    assert!(pool.construct(0).is_err());

    for (i, item) in items.into_iter().enumerate() {
        assert_eq!(*item, i);
        pool.destroy(item);
    }

    assert!(pool.is_empty());

    // The timing demo loop: one slot constructed and destroyed over and over.
    for i in 0..capacity {
        let item = pool.construct(i).unwrap();
        pool.destroy(item);
    }

    assert!(pool.is_empty());
}

#[test]
fn destructors_run_in_destroy_order() {
    struct Noisy {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Drop for Noisy {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut pool = SlotPool::<Noisy>::with_capacity(3);

    let make = |name| Noisy {
        name,
        log: Rc::clone(&log),
    };

    let first = pool.construct(make("first")).unwrap();
    let second = pool.construct(make("second")).unwrap();
    let third = pool.construct(make("third")).unwrap();

    pool.destroy(second);
    pool.destroy(third);
    pool.destroy(first);

    assert_eq!(*log.borrow(), ["second", "third", "first"]);
}

#[test]
fn raw_and_typed_access_share_slots() {
    let mut pool = SlotPool::<u32>::with_capacity(2);

    let raw = pool.acquire().unwrap();
    let typed = pool.construct(8).unwrap();
    assert!(pool.is_full());

    // SAFETY: The slot came from this pool and holds no value.
    unsafe {
        pool.release(raw);
    }

    let reused = pool.construct(9).unwrap();
    assert_eq!(reused.ptr(), raw);

    pool.destroy(typed);
    pool.destroy(reused);
}

#[test]
fn pool_moves_between_threads() {
    let mut pool = SlotPool::<String>::with_capacity(4);
    let item = pool.construct("from main".to_string()).unwrap();

    let (pool, item) = thread::spawn(move || {
        let mut pool = pool;
        let other = pool.construct("from worker".to_string()).unwrap();
        assert_eq!(&*other, "from worker");
        pool.destroy(other);
        (pool, item)
    })
    .join()
    .unwrap();

    let mut pool = pool;
    assert_eq!(&*item, "from main");
    pool.destroy(item);
    assert!(pool.is_empty());
}

#[test]
fn strict_pool_is_fine_when_cleaned_up() {
    let mut pool = SlotPool::<Vec<u8>>::builder()
        .capacity(NonZero::new(2).unwrap())
        .drop_policy(DropPolicy::MustNotLeakItems)
        .build();

    let a = pool.construct(vec![1]).unwrap();
    let b = pool.construct(vec![2]).unwrap();
    pool.destroy(a);
    pool.destroy(b);
}
