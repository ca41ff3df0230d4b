use thiserror::Error;

/// Errors that can occur when obtaining storage from a [`SlotPool`][crate::SlotPool].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Every slot in the pool is currently acquired. The pool never grows, so the caller must
    /// either return some storage to the pool or fall back to another allocation strategy.
    #[error("slot pool is out of capacity: all {capacity} slots are in use")]
    OutOfCapacity {
        /// The fixed capacity of the pool that ran out of slots.
        capacity: usize,
    },
}

/// A specialized `Result` type for slot pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
