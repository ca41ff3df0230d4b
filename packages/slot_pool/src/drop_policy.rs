/// Determines what happens when a pool is dropped while some of its slots are still acquired.
///
/// The pool does not track which acquired slots hold a constructed value, so it can never run
/// destructors for items left behind. Instead, if anything is left behind, the whole backing
/// region is leaked so that outstanding [`Pooled`][crate::Pooled] handles stay valid.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = SlotPool::<u32>::builder()
///     .drop_policy(DropPolicy::MustNotLeakItems)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Slots still acquired when the pool is dropped are leaked together with the rest of the
    /// backing region. This is the default.
    #[default]
    MayLeakItems,

    /// The pool will panic if it still has acquired slots when it is dropped.
    ///
    /// This may be valuable if every item is expected to be explicitly destroyed, for example
    /// because its destructor releases some external resource that must not be leaked.
    MustNotLeakItems,
}
