#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity object pool for values of a single type, with O(1) acquire and release.
//!
//! [`SlotPool<T>`] allocates one contiguous backing region of `capacity` slots when it is
//! created and never grows or reallocates. Every slot is sized and aligned for one `T`. A slot
//! that does not hold a value instead holds a link to the next free slot, so the unused slots form
//! an intrusive free list with no bookkeeping memory beyond the slots themselves.
//!
//! * Acquiring storage pops the head of the free list.
//! * Releasing storage pushes the slot back onto the head.
//!
//! Both are constant-time and touch only the head pointer and one slot. Slots are reused in
//! most-recently-released-first order.
//!
//! # Raw and typed access
//!
//! [`SlotPool::acquire()`] returns uninitialized storage and [`SlotPool::release()`] takes it
//! back. Releasing is `unsafe` because the pool trusts the caller to only return its own, still
//! acquired storage.
//!
//! [`SlotPool::construct()`] places a value in a slot and returns a [`Pooled<T>`] handle, which
//! dereferences to the value. [`SlotPool::destroy()`] consumes the handle, drops the value and
//! releases the slot. Because the handle can be neither copied nor cloned and remembers which pool
//! it came from, this layer is entirely safe.
//!
//! # Capacity
//!
//! When every slot is in use, acquisition and construction fail with
//! [`Error::OutOfCapacity`], leaving the caller to free some slots or fall back to another
//! allocation strategy.
//!
//! # Examples
//!
//! ```
//! use slot_pool::{Error, SlotPool};
//!
//! let mut pool = SlotPool::<u64>::with_capacity(2);
//!
//! let a = pool.construct(1).unwrap();
//! let b = pool.construct(2).unwrap();
//! assert_eq!(*a + *b, 3);
//!
//! assert_eq!(
//!     pool.construct(3).unwrap_err(),
//!     Error::OutOfCapacity { capacity: 2 }
//! );
//!
//! pool.destroy(a);
//! let c = pool.construct(3).unwrap();
//! assert_eq!(*c, 3);
//!
//! pool.destroy(b);
//! pool.destroy(c);
//! ```
//!
//! # Teardown
//!
//! The pool does not know which acquired slots hold values, so it cannot drop them when it is
//! dropped itself. If any slot is still acquired at that point, the backing region is leaked so
//! that outstanding handles remain valid. The [`DropPolicy`] can turn this situation into a panic
//! instead.

mod builder;
mod drop_policy;
mod error;
mod pool;
mod pooled;
mod slot;

pub use builder::*;
pub use drop_policy::*;
pub use error::*;
pub use pool::SlotPool;
pub use pooled::Pooled;
pub(crate) use slot::*;
