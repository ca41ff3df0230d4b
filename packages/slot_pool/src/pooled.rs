use std::fmt;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::ptr::NonNull;

/// Exclusive handle to a value constructed in a [`SlotPool`][crate::SlotPool].
///
/// The handle is returned by the pool's construction methods and is consumed by
/// [`destroy()`][crate::SlotPool::destroy] or [`take()`][crate::SlotPool::take]. It implements
/// neither [`Copy`] nor [`Clone`], so a value cannot be destroyed twice.
///
/// The value lives in the pool's backing region and never moves while the handle exists, which
/// makes it safe to hand out pinned references via [`as_pin()`][Self::as_pin] and
/// [`as_pin_mut()`][Self::as_pin_mut]. For a `T` that is not [`Unpin`], the handle gives out no
/// `&mut T` and the pool will not [`take()`][crate::SlotPool::take] the value, so the only way
/// out of the slot is to be dropped in place by [`destroy()`][crate::SlotPool::destroy].
///
/// Dropping the handle without returning it to the pool leaks the slot: the value is neither
/// dropped nor is its slot reused.
///
/// # Examples
///
/// ```
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<String>::with_capacity(4);
///
/// let mut item = pool.construct("Hello".to_string()).unwrap();
/// item.push_str(", World!");
/// assert_eq!(&*item, "Hello, World!");
///
/// pool.destroy(item);
/// ```
pub struct Pooled<T> {
    /// Ensures this handle can only be returned to the pool it came from.
    pool_id: u64,

    ptr: NonNull<T>,
}

impl<T> Pooled<T> {
    #[must_use]
    pub(crate) fn new(pool_id: u64, ptr: NonNull<T>) -> Self {
        Self { pool_id, ptr }
    }

    #[must_use]
    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Returns a pointer to the value.
    ///
    /// The pointer is valid until the handle is returned to the pool. The owner of the handle has
    /// exclusive access to the value and may create both shared and exclusive references from it,
    /// as long as those references do not overlap with ones obtained through the handle itself.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Returns a pinned shared reference to the value.
    #[must_use]
    #[inline]
    pub fn as_pin(&self) -> Pin<&T> {
        // SAFETY: The value sits in a slot of the backing region, which never moves or gets
        // reallocated, and the slot is not reused until this handle is consumed. A value that is
        // not `Unpin` is never moved out either: `take()` and `DerefMut` require `T: Unpin`, so
        // such a value leaves its slot only by being dropped in place.
        unsafe { Pin::new_unchecked(self.ptr.as_ref()) }
    }

    /// Returns a pinned exclusive reference to the value.
    #[must_use]
    #[inline]
    pub fn as_pin_mut(&mut self) -> Pin<&mut T> {
        // SAFETY: See `as_pin()`. The handle is exclusive, so so is the reference.
        unsafe { Pin::new_unchecked(self.ptr.as_mut()) }
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // SAFETY: The handle is only created after the value is initialized, the value stays in
        // place until the handle is consumed, and the pool never frees its backing region while
        // any slot is still acquired.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Unpin> DerefMut for Pooled<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: As for `deref()`, plus the handle grants exclusive access to the value.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool_id", &self.pool_id)
            .field("ptr", &self.ptr)
            .finish()
    }
}

// SAFETY: The handle owns its value exclusively, like a `Box<T>`, so it can move between threads
// whenever `T` can.
unsafe impl<T: Send> Send for Pooled<T> {}

// SAFETY: Shared access to the handle only gives out `&T`, so sharing it is fine when `T: Sync`.
unsafe impl<T: Sync> Sync for Pooled<T> {}
