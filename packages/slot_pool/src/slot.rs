use std::alloc::Layout;
use std::mem::ManuallyDrop;
use std::num::NonZero;
use std::ptr::NonNull;

/// One storage cell of a pool's backing region.
///
/// A slot is either free, in which case `next_free` links it to the next free slot (`None` marks
/// the end of the free list), or acquired, in which case its bytes belong to the caller and may
/// hold a value of `T`. Both states share the same memory, so a slot takes the space of the
/// larger of `T` and a pointer, padded to the stricter of the two alignments.
///
/// Nothing in the slot records which state it is in. The pool knows that every slot reachable
/// from its free-list head is free and that every other slot is acquired.
#[repr(C)]
pub(crate) union Slot<T> {
    #[allow(
        dead_code,
        reason = "only accessed via pointer casts; exists to give the slot the size and alignment of T"
    )]
    value: ManuallyDrop<T>,

    next_free: Option<NonNull<Slot<T>>>,
}

impl<T> Slot<T> {
    /// Layout of a contiguous array of `capacity` slots.
    #[must_use]
    pub(crate) fn array_layout(capacity: NonZero<usize>) -> Layout {
        Layout::array::<Self>(capacity.get())
            .expect("slot pool capacity is too large to fit in the address space")
    }

    /// Marks the slot as free, linking it to `next_free`.
    ///
    /// Any value in the slot is overwritten without being dropped.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for writes of `Slot<T>` and must not be referenced by anyone else.
    pub(crate) unsafe fn write_next_free(slot: NonNull<Self>, next_free: Option<NonNull<Self>>) {
        // SAFETY: Forwarding guarantees from the caller.
        unsafe {
            slot.write(Self { next_free });
        }
    }

    /// Reads the link stored in a free slot.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for reads and must currently be free.
    #[must_use]
    pub(crate) unsafe fn read_next_free(slot: NonNull<Self>) -> Option<NonNull<Self>> {
        // SAFETY: The caller guarantees the slot is free, so `next_free` is the active field.
        unsafe { (*slot.as_ptr()).next_free }
    }

    /// Pointer to the storage for a value of `T` inside the slot.
    #[must_use]
    pub(crate) fn value_ptr(slot: NonNull<Self>) -> NonNull<T> {
        // With `repr(C)`, every union field starts at offset 0 and `ManuallyDrop<T>` is
        // transparent, so the slot address is the value address.
        slot.cast::<T>()
    }

    /// Inverse of [`value_ptr()`][Self::value_ptr].
    #[must_use]
    pub(crate) fn from_value_ptr(ptr: NonNull<T>) -> NonNull<Self> {
        ptr.cast::<Self>()
    }
}
