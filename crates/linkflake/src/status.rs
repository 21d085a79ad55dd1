use crate::SnowflakeId;

/// Why the generator could not mint an ID right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingCause {
    /// The clock reads earlier than the last committed timestamp.
    ClockRollback,
    /// All sequence values of the current millisecond are used.
    SequenceExhausted,
    /// Another caller holds the generator, possibly while it waits for the
    /// clock. Retry right away or after yielding.
    Contended,
}

/// Represents the result of one non-blocking attempt to mint an ID.
///
/// - [`IdGenStatus::Ready`] indicates a new ID was committed.
/// - [`IdGenStatus::Pending`] means the generator cannot produce an ID until
///   the clock advances by at least `yield_for` milliseconds.
///
/// This allows callers with their own scheduler (e.g. an async runtime) to
/// back off without blocking a thread.
///
/// # Example
///
/// ```
/// use linkflake::{IdGenStatus, LockSnowflakeGenerator, NodeIdentity, SystemClock};
///
/// let generator =
///     LockSnowflakeGenerator::with_node(NodeIdentity::new(0, 1).unwrap(), SystemClock::default());
/// match generator.try_poll_id().unwrap() {
///     IdGenStatus::Ready { id } => println!("ID: {id}"),
///     IdGenStatus::Pending { yield_for, cause } => println!("{cause:?}: back off {yield_for}ms"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated; retry once the clock moved forward.
    Pending {
        /// Milliseconds to wait before trying again.
        yield_for: u64,
        /// What the generator is waiting for.
        cause: PendingCause,
    },
}
