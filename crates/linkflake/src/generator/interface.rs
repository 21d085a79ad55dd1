use std::sync::Arc;

use crate::{IdGenStatus, Result, SnowflakeId};

/// A minimal interface for minting Snowflake IDs.
///
/// This is the seam the rest of an application depends on: a persistence
/// layer asks for a key and gets one, without knowing which generator or
/// clock sits behind it.
pub trait SnowflakeGenerator {
    /// Mints the next ID, blocking while the clock catches up.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait was interrupted, the lock is poisoned or
    /// the timestamp no longer fits the ID layout.
    fn next_id(&self) -> Result<SnowflakeId>;

    /// Attempts to mint the next ID without blocking.
    ///
    /// The returned [`IdGenStatus`] contains either:
    /// - the newly generated ID, or
    /// - a duration to yield/sleep and why.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the timestamp no longer
    /// fits the ID layout.
    fn try_poll_id(&self) -> Result<IdGenStatus>;
}

impl<G> SnowflakeGenerator for Arc<G>
where
    G: SnowflakeGenerator + ?Sized,
{
    fn next_id(&self) -> Result<SnowflakeId> {
        (**self).next_id()
    }

    fn try_poll_id(&self) -> Result<IdGenStatus> {
        (**self).try_poll_id()
    }
}
