use std::alloc::{alloc, dealloc};
use std::any::type_name;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};
use std::{fmt, thread};

use tracing::{debug, warn};

use crate::{DEFAULT_CAPACITY, DropPolicy, Error, Pooled, Result, Slot, SlotPoolBuilder};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A fixed-capacity pool of storage slots for values of type `T`.
///
/// All slots are allocated up front as one contiguous backing region. Slots that are not in use
/// form an intrusive free list: each free slot stores a pointer to the next free slot in the same
/// memory that would otherwise hold a value, so the pool has no per-slot bookkeeping at all.
/// Acquiring pops the head of the free list and releasing pushes onto it, both in O(1). Released
/// slots are therefore reused most-recently-released first.
///
/// There are two layers of API:
///
/// * [`acquire()`][Self::acquire] and [`release()`][Self::release] hand out and take back raw,
///   uninitialized storage. Releasing is `unsafe` because the pool cannot tell whether a pointer
///   really is one of its acquired slots.
/// * [`construct()`][Self::construct] and [`destroy()`][Self::destroy] build on top of these to
///   place a value in a slot and later drop it and release the slot. The [`Pooled<T>`] handle
///   returned by construction makes this layer safe to use.
///
/// The pool never grows. Once every slot is acquired, further acquisition fails with
/// [`Error::OutOfCapacity`].
///
/// # Examples
///
/// ```
/// use slot_pool::{Error, SlotPool};
///
/// let mut pool = SlotPool::<i32>::with_capacity(2);
///
/// let five = pool.construct(5).unwrap();
/// let seven = pool.construct(7).unwrap();
///
/// assert!(matches!(
///     pool.construct(9),
///     Err(Error::OutOfCapacity { capacity: 2 })
/// ));
///
/// let five_addr = five.ptr();
/// pool.destroy(five);
///
/// // The slot that was released last is the first one reused.
/// let nine = pool.construct(9).unwrap();
/// assert_eq!(nine.ptr(), five_addr);
/// assert_eq!(*nine, 9);
///
/// pool.destroy(seven);
/// pool.destroy(nine);
/// ```
///
/// # Thread safety
///
/// The pool can be moved to another thread if `T: Send` but cannot be shared between threads.
/// Every mutating operation requires `&mut self`.
pub struct SlotPool<T> {
    first_slot_ptr: NonNull<Slot<T>>,

    capacity: NonZero<usize>,

    /// Head of the intrusive free list. Think of this as a stack of the most recently released
    /// slots, with the stack links stored in the slots themselves. `None` if the pool is full.
    next_free: Option<NonNull<Slot<T>>>,

    /// Number of slots currently acquired. Not needed for the free list itself but lets the pool
    /// decide at drop time whether its backing region may still be referenced.
    count: usize,

    /// Ensures handles can only be returned to the pool they came from.
    pool_id: u64,

    drop_policy: DropPolicy,
}

impl<T> SlotPool<T> {
    /// Creates a new pool with [`DEFAULT_CAPACITY`] slots and the default drop policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{DEFAULT_CAPACITY, SlotPool};
    ///
    /// let pool = SlotPool::<u64>::new();
    ///
    /// assert_eq!(pool.capacity(), DEFAULT_CAPACITY.get());
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new pool with room for exactly `capacity` values and the default drop policy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<String>::with_capacity(8);
    ///
    /// assert_eq!(pool.capacity(), 8);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZero::new(capacity).expect("slot pool capacity must be non-zero");

        Self::builder().capacity(capacity).build()
    }

    /// Creates a builder for configuring and constructing a pool.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{DropPolicy, SlotPool};
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotLeakItems)
    ///     .build();
    /// ```
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn new_inner(capacity: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        let layout = Slot::<T>::array_layout(capacity);

        // SAFETY: The layout is non-zero-sized because there is at least one slot and every
        // slot is at least pointer-sized.
        let first_slot_ptr = NonNull::new(unsafe { alloc(layout) })
            .expect("we do not intend to handle allocation failure as a real possibility - OOM results in panic")
            .cast::<Slot<T>>();

        // Chain all slots in index order, with the last one terminating the free list.
        let mut slot = first_slot_ptr;

        for index in 1..capacity.get() {
            // SAFETY: index < capacity, so the pointer is inside the region we just allocated.
            let next = unsafe { first_slot_ptr.add(index) };

            // SAFETY: The slot is inside our fresh allocation and nobody else knows about it.
            unsafe {
                Slot::write_next_free(slot, Some(next));
            }

            slot = next;
        }

        // SAFETY: As above, this is the last slot of the allocation.
        unsafe {
            Slot::write_next_free(slot, None);
        }

        let pool_id = generate_pool_id();

        debug!(
            pool_id,
            capacity = capacity.get(),
            slot_size = size_of::<Slot<T>>(),
            item_type = type_name::<T>(),
            "slot pool created"
        );

        Self {
            first_slot_ptr,
            capacity,
            next_free: Some(first_slot_ptr),
            count: 0,
            pool_id,
            drop_policy,
        }
    }

    /// The number of slots in the pool, acquired or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// The number of slots currently acquired, whether they hold a value or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no slot is currently acquired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether every slot is acquired, meaning the next acquisition will fail.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.next_free.is_none()
    }

    /// Takes a free slot out of the pool and returns a pointer to its storage.
    ///
    /// The storage is uninitialized, sized and aligned for one `T`. It stays valid until it is
    /// given back via [`release()`][Self::release] or the pool is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCapacity`] if every slot is already acquired.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u64>::with_capacity(1);
    ///
    /// let storage = pool.acquire().unwrap();
    /// assert!(pool.acquire().is_err());
    ///
    /// // SAFETY: The storage is ours, valid and aligned for a u64.
    /// unsafe { storage.write(42) };
    ///
    /// // SAFETY: The storage came from this pool and u64 needs no dropping.
    /// unsafe { pool.release(storage) };
    /// assert!(pool.acquire().is_ok());
    /// ```
    pub fn acquire(&mut self) -> Result<NonNull<T>> {
        let Some(slot) = self.next_free else {
            return Err(Error::OutOfCapacity {
                capacity: self.capacity.get(),
            });
        };

        // Pop the slot off the free list.
        // SAFETY: Every slot reachable from the head of the free list is free.
        self.next_free = unsafe { Slot::read_next_free(slot) };

        // Cannot overflow because we cannot acquire more than capacity slots.
        self.count = self.count.wrapping_add(1);

        Ok(Slot::value_ptr(slot))
    }

    /// Returns a slot to the pool, making it available to the next acquisition.
    ///
    /// Whatever is in the slot is overwritten without being dropped. If a value was constructed
    /// in it, drop it first (or use [`destroy()`][Self::destroy], which does both).
    ///
    /// # Safety
    ///
    /// The caller must guarantee that:
    ///
    /// * `ptr` was returned by [`acquire()`][Self::acquire] on this pool and has not been released
    ///   since.
    /// * No references to the slot's storage exist and the pointer is not used after this call.
    ///
    /// Debug builds check that the pointer lies on a slot boundary inside this pool. Release
    /// builds check nothing.
    pub unsafe fn release(&mut self, ptr: NonNull<T>) {
        let slot = Slot::from_value_ptr(ptr);

        #[cfg(debug_assertions)]
        self.assert_releasable(slot);

        // Push the slot onto the free list.
        // SAFETY: The caller guarantees this is one of our acquired slots with no live references.
        unsafe {
            Slot::write_next_free(slot, self.next_free);
        }

        self.next_free = Some(slot);

        // Cannot underflow because the caller guarantees the slot was acquired.
        self.count = self.count.wrapping_sub(1);
    }

    /// Moves `value` into a free slot and returns an exclusive handle to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCapacity`] if every slot is already acquired. The value is dropped
    /// in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::with_capacity(4);
    ///
    /// let greeting = pool.construct("hello".to_string()).unwrap();
    /// assert_eq!(&*greeting, "hello");
    ///
    /// pool.destroy(greeting);
    /// ```
    pub fn construct(&mut self, value: T) -> Result<Pooled<T>> {
        self.construct_with(|uninit| uninit.write(value))
    }

    /// Initializes a value in place in a free slot and returns an exclusive handle to it.
    ///
    /// The closure receives the uninitialized slot storage and must return the reference it gets
    /// from initializing it, typically via [`MaybeUninit::write()`]. This avoids constructing a
    /// large value on the stack only to move it into the pool.
    ///
    /// If the closure panics, the slot remains acquired and uninitialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCapacity`] if every slot is already acquired. The closure is not
    /// called in that case.
    ///
    /// # Panics
    ///
    /// Panics if the closure returns a reference to anything other than the slot it was given.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<[u64; 512]>::with_capacity(2);
    ///
    /// let block = pool.construct_with(|uninit| uninit.write([7; 512])).unwrap();
    /// assert!(block.iter().all(|&x| x == 7));
    ///
    /// pool.destroy(block);
    /// ```
    pub fn construct_with(
        &mut self,
        f: impl FnOnce(&mut MaybeUninit<T>) -> &mut T,
    ) -> Result<Pooled<T>> {
        let ptr = self.acquire()?;

        // SAFETY: The storage is valid and aligned for T, and we just took it off the free list
        // so nobody else references it. MaybeUninit<T> has the same layout as T.
        let uninit = unsafe { ptr.cast::<MaybeUninit<T>>().as_mut() };

        let initialized = f(uninit);

        // The only way to obtain a reference to the slot's storage is to initialize it.
        assert!(
            ptr::eq(initialized, ptr.as_ptr()),
            "construct_with() closure returned a reference to something other than the provided slot in pool of {}",
            type_name::<T>()
        );

        Ok(Pooled::new(self.pool_id, ptr))
    }

    /// Moves the value produced by a fallible constructor into a free slot and returns an
    /// exclusive handle to it.
    ///
    /// A slot is acquired before the constructor runs. If the constructor fails, its error is
    /// returned unchanged and the slot remains acquired and uninitialized. The pool does not
    /// give the slot back on its own; the caller may keep retrying into other slots or drop the
    /// pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCapacity`], converted into `E`, if every slot is already acquired.
    /// The constructor is not called in that case. Otherwise returns whatever error the
    /// constructor returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{Error, SlotPool};
    ///
    /// #[derive(Debug)]
    /// enum ParseIntoPoolError {
    ///     Pool(Error),
    ///     Parse(std::num::ParseIntError),
    /// }
    ///
    /// impl From<Error> for ParseIntoPoolError {
    ///     fn from(e: Error) -> Self {
    ///         Self::Pool(e)
    ///     }
    /// }
    ///
    /// let mut pool = SlotPool::<u32>::with_capacity(4);
    ///
    /// let parsed = pool
    ///     .try_construct(|| "42".parse().map_err(ParseIntoPoolError::Parse))
    ///     .unwrap();
    /// assert_eq!(*parsed, 42);
    ///
    /// let failed = pool.try_construct(|| "x".parse().map_err(ParseIntoPoolError::Parse));
    /// assert!(matches!(failed, Err(ParseIntoPoolError::Parse(_))));
    ///
    /// // The failed construction kept its slot.
    /// assert_eq!(pool.len(), 2);
    /// ```
    pub fn try_construct<E>(
        &mut self,
        f: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<Pooled<T>, E>
    where
        E: From<Error>,
    {
        let ptr = self.acquire()?;

        let value = f()?;

        // SAFETY: The storage is valid and aligned for T and nobody else references it.
        unsafe {
            ptr.write(value);
        }

        Ok(Pooled::new(self.pool_id, ptr))
    }

    /// Drops the value behind a handle and returns its slot to the pool.
    ///
    /// Passing `None` does nothing, which is convenient for optional handles.
    ///
    /// # Panics
    ///
    /// Panics if the handle was created by a different pool.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{Pooled, SlotPool};
    ///
    /// let mut pool = SlotPool::<u32>::with_capacity(1);
    ///
    /// let item = pool.construct(1).unwrap();
    /// pool.destroy(item);
    ///
    /// let nothing: Option<Pooled<u32>> = None;
    /// pool.destroy(nothing);
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn destroy(&mut self, item: impl Into<Option<Pooled<T>>>) {
        let Some(item) = item.into() else {
            return;
        };

        self.assert_owned(&item);

        let ptr = item.ptr();

        // SAFETY: The handle guarantees an initialized value, and consuming the handle
        // guarantees nobody will access the value again.
        unsafe {
            ptr.drop_in_place();
        }

        // SAFETY: The handle came from this pool (checked above), so the slot is one of ours and
        // is acquired. Its value was just dropped.
        unsafe {
            self.release(ptr);
        }
    }

    /// Moves the value behind a handle out of the pool and returns its slot to the pool.
    ///
    /// Only available for `T: Unpin`. Values in the pool may have been pinned through
    /// [`Pooled::as_pin()`], and a pinned value that is not `Unpin` must stay where it is until
    /// it is dropped. Use [`destroy()`][Self::destroy] for such values.
    ///
    /// ```compile_fail
    /// use std::marker::PhantomPinned;
    ///
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<PhantomPinned>::with_capacity(1);
    ///
    /// let item = pool.construct(PhantomPinned).unwrap();
    /// let _value = pool.take(item);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the handle was created by a different pool.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<String>::with_capacity(1);
    ///
    /// let item = pool.construct("moved out".to_string()).unwrap();
    /// let value = pool.take(item);
    ///
    /// assert_eq!(value, "moved out");
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn take(&mut self, item: Pooled<T>) -> T
    where
        T: Unpin,
    {
        self.assert_owned(&item);

        let ptr = item.ptr();

        // SAFETY: The handle guarantees an initialized value, and consuming the handle
        // guarantees nobody will access the value again, so moving it out is fine.
        let value = unsafe { ptr.read() };

        // SAFETY: The handle came from this pool (checked above) and the slot no longer holds
        // a value we are responsible for.
        unsafe {
            self.release(ptr);
        }

        value
    }

    fn assert_owned(&self, item: &Pooled<T>) {
        assert!(
            item.pool_id() == self.pool_id,
            "attempted to return a handle to a different pool (handle pool ID: {}, current pool ID: {})",
            item.pool_id(),
            self.pool_id
        );
    }

    /// Returns the index of the slot in the backing region, or `None` if the pointer does not
    /// point to the start of one of our slots.
    #[cfg(any(test, debug_assertions))]
    fn slot_index(&self, slot: NonNull<Slot<T>>) -> Option<usize> {
        let offset = slot
            .addr()
            .get()
            .checked_sub(self.first_slot_ptr.addr().get())?;

        let slot_size = size_of::<Slot<T>>();

        if offset.checked_rem(slot_size)? != 0 {
            return None;
        }

        let index = offset.checked_div(slot_size)?;

        (index < self.capacity.get()).then_some(index)
    }

    #[cfg(debug_assertions)]
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    fn assert_releasable(&self, slot: NonNull<Slot<T>>) {
        assert!(
            self.slot_index(slot).is_some(),
            "released pointer {slot:?} is not a slot of this pool of {}",
            type_name::<T>()
        );

        assert!(
            !self.is_empty(),
            "released a slot of an empty pool of {}",
            type_name::<T>()
        );

        assert!(
            self.next_free != Some(slot),
            "released slot {slot:?} that is already at the head of the free list in pool of {}",
            type_name::<T>()
        );
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("pool_id", &self.pool_id)
            .field("capacity", &self.capacity)
            .field("count", &self.count)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        let leaked = self.count;

        if leaked == 0 {
            debug!(pool_id = self.pool_id, "slot pool dropped");
        } else {
            warn!(
                pool_id = self.pool_id,
                item_type = type_name::<T>(),
                leaked,
                leaked_bytes = Slot::<T>::array_layout(self.capacity).size(),
                "slot pool dropped with acquired slots, leaking its backing region"
            );
        }

        // With slots still acquired, handles may still point into the region, so it has to
        // outlive the pool.
        if leaked == 0 {
            // SAFETY: The layout matches the one we allocated with.
            unsafe {
                dealloc(
                    self.first_slot_ptr.as_ptr().cast(),
                    Slot::<T>::array_layout(self.capacity),
                );
            }
        }

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotLeakItems && !thread::panicking() {
            assert!(
                leaked == 0,
                "dropped a slot pool of {} with {leaked} acquired slots and a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}

// SAFETY: The raw pointers only ever refer to the region the pool owns, so nothing ties the pool
// to a thread. Values of T live in that region, so T itself must be able to move between threads.
unsafe impl<T: Send> Send for SlotPool<T> {}

#[cfg(test)]
impl<T> SlotPool<T> {
    /// Walks the free list from its head and returns the index of every slot on it, in order.
    ///
    /// Panics if the list leaves the region, revisits a slot or is longer than the capacity.
    fn free_slot_indices(&self) -> Vec<usize> {
        let mut visited = vec![false; self.capacity.get()];
        let mut indices = Vec::new();
        let mut current = self.next_free;

        while let Some(slot) = current {
            let index = self
                .slot_index(slot)
                .expect("free list link points outside the backing region");

            let seen = visited.get_mut(index).expect("guarded by slot_index()");
            assert!(!*seen, "free list visits slot {index} twice");
            *seen = true;

            indices.push(index);

            // SAFETY: Every slot reachable from the head of the free list is free.
            current = unsafe { Slot::read_next_free(slot) };
        }

        indices
    }

    fn integrity_check(&self) {
        let free = self.free_slot_indices();

        assert_eq!(
            free.len(),
            self.capacity.get() - self.count,
            "free list length does not match capacity minus acquired count"
        );
        assert_eq!(self.is_full(), free.is_empty());
    }
}
