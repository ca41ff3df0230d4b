use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DropPolicy, SlotPool};

/// The capacity of a pool created via [`SlotPool::new()`] or a builder whose capacity was
/// never set.
pub const DEFAULT_CAPACITY: NonZero<usize> = NonZero::new(100_000).unwrap();

/// Builder for creating an instance of [`SlotPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// [`SlotPool::new()`] and [`SlotPool::with_capacity()`] cover the common cases.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<u32>::builder()
///     .capacity(NonZero::new(16).unwrap())
///     .drop_policy(DropPolicy::MustNotLeakItems)
///     .build();
///
/// assert_eq!(pool.capacity(), 16);
/// ```
#[must_use]
pub struct SlotPoolBuilder<T> {
    capacity: NonZero<usize>,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for SlotPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("capacity", &self.capacity)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> SlotPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in the pool. The pool allocates all of them up front and never
    /// grows beyond this.
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat slots that are still acquired when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool, allocating its backing region and threading every slot onto the
    /// free list.
    ///
    /// # Panics
    ///
    /// Panics if the backing region does not fit in the address space or cannot be allocated.
    #[must_use]
    pub fn build(self) -> SlotPool<T> {
        SlotPool::new_inner(self.capacity, self.drop_policy)
    }
}
