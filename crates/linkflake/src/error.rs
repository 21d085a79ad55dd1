use core::fmt;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Which half of a [`NodeIdentity`] a configuration error refers to.
///
/// [`NodeIdentity`]: crate::NodeIdentity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeField {
    DatacenterId,
    WorkerId,
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatacenterId => f.write_str("datacenter id"),
            Self::WorkerId => f.write_str("worker id"),
        }
    }
}

/// All error variants that `linkflake` can emit.
///
/// A clock rollback is not an error: the generator waits it out and only
/// logs it. Everything here is returned to the caller, and no ID is produced
/// by a call that fails.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A datacenter or worker id does not fit its 5-bit field.
    ///
    /// Raised once, while resolving the node identity. A generator is never
    /// built from an invalid identity, so this is fatal for the process.
    #[error("{field} {value} is outside the valid range 0..={max}")]
    Configuration {
        field: NodeField,
        value: i64,
        max: u64,
    },

    /// A wait for the clock was aborted through an [`InterruptHandle`].
    ///
    /// The call minted nothing; it may be retried once the handle is reset.
    ///
    /// [`InterruptHandle`]: crate::InterruptHandle
    #[error("interrupted while waiting for the clock")]
    Interrupted,

    /// A caller-supplied deadline elapsed while waiting for the clock.
    #[error("clock unavailable: gave up after waiting {waited_ms}ms")]
    ClockTimeout { waited_ms: u64 },

    /// The generator state lock was poisoned by a panicking thread.
    ///
    /// With the `parking-lot` feature mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator state lock was poisoned")]
    LockPoisoned,

    /// The clock is past the last millisecond the 41-bit field can hold.
    #[error("timestamp {millis}ms does not fit the 41-bit timestamp field")]
    TimestampOverflow { millis: u64 },
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
