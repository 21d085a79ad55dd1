use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::wait::Waiter;
use crate::{
    GeneratorState, IdGenStatus, InterruptHandle, NodeConfig, NodeIdentity, Result,
    SequenceClock, SnowflakeGenerator, SnowflakeId, SysfsHardwareAddress, SystemClock, Tick,
    TimeSource,
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The node identity is fixed at construction; the timestamp and sequence live
/// in a [`SequenceClock`] behind one mutex. Build one per process and share it
/// by reference or through an [`Arc`](std::sync::Arc).
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Waits out clock rollbacks instead of minting smaller IDs
/// - ✅ Optional deadline and interruption for every wait
///
/// # Example
///
/// ```
/// use std::{sync::Arc, thread};
/// use linkflake::{LockSnowflakeGenerator, NodeIdentity, SystemClock};
///
/// let generator = Arc::new(LockSnowflakeGenerator::with_node(
///     NodeIdentity::new(1, 2).unwrap(),
///     SystemClock::default(),
/// ));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let generator = Arc::clone(&generator);
///         thread::spawn(move || generator.next_id().unwrap())
///     })
///     .collect();
///
/// for handle in handles {
///     let id = handle.join().unwrap();
///     assert_eq!(id.worker_id(), 2);
/// }
/// ```
#[derive(Debug)]
pub struct LockSnowflakeGenerator<T: TimeSource = SystemClock> {
    node: NodeIdentity,
    clock: SequenceClock<T>,
    interrupt: InterruptHandle,
}

impl LockSnowflakeGenerator<SystemClock> {
    /// Creates the process-wide generator on the system clock at
    /// [`TWITTER_EPOCH`], resolving this host's [`NodeIdentity`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `explicit_datacenter_id` is outside
    /// `0..=31`. The process should not start in that case.
    ///
    /// [`TWITTER_EPOCH`]: crate::TWITTER_EPOCH
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn new(explicit_datacenter_id: Option<i64>) -> Result<Self> {
        let node = NodeIdentity::resolve(explicit_datacenter_id)?;
        Ok(Self::with_node(node, SystemClock::default()))
    }
}

impl<T: TimeSource> LockSnowflakeGenerator<T> {
    /// Resolves the node identity from `config` and the host, then builds a
    /// generator on `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if an explicit id in `config` is
    /// outside `0..=31`.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn from_config(config: &NodeConfig, time: T) -> Result<Self> {
        let node = NodeIdentity::resolve_with(config, &SysfsHardwareAddress::default(), &time)?;
        Ok(Self::with_node(node, time))
    }

    /// Creates a generator for an already resolved identity, starting from a
    /// zero state.
    pub fn with_node(node: NodeIdentity, time: T) -> Self {
        Self::from_state(node, GeneratorState::default(), time)
    }

    /// Creates a generator preloaded with a state.
    ///
    /// Useful to resume above a persisted high-water mark: the generator will
    /// not mint anything at or below `state` until the clock passes it.
    pub fn from_state(node: NodeIdentity, state: GeneratorState, time: T) -> Self {
        Self {
            node,
            clock: SequenceClock::new(state, time),
            interrupt: InterruptHandle::default(),
        }
    }

    pub fn node(&self) -> NodeIdentity {
        self.node
    }

    pub fn clock(&self) -> &SequenceClock<T> {
        &self.clock
    }

    /// A handle that aborts this generator's clock waits.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Mints the next ID, blocking while the clock catches up.
    ///
    /// Within one millisecond IDs differ by sequence; after 4096 of them the
    /// call waits for the next millisecond. If the clock moved backward the
    /// call waits until it is back at the last committed millisecond.
    ///
    /// # Errors
    ///
    /// - [`Error::Interrupted`] if the [`InterruptHandle`] fired during a wait
    /// - [`Error::LockPoisoned`] if another thread panicked holding the lock
    /// - [`Error::TimestampOverflow`] if the clock is past the 41-bit range
    ///
    /// [`Error::Interrupted`]: crate::Error::Interrupted
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let state = self.clock.tick(&Waiter::new(&self.interrupt, None))?;
        Ok(self.pack(state))
    }

    /// Like [`next_id`](Self::next_id), but gives up once `deadline` passes
    /// while waiting for the clock, or while queued behind another caller
    /// that is.
    ///
    /// # Errors
    ///
    /// Everything [`next_id`](Self::next_id) returns, plus
    /// [`Error::ClockTimeout`].
    ///
    /// [`Error::ClockTimeout`]: crate::Error::ClockTimeout
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id_with_deadline(&self, deadline: Instant) -> Result<SnowflakeId> {
        let state = self
            .clock
            .tick(&Waiter::new(&self.interrupt, Some(deadline)))?;
        Ok(self.pack(state))
    }

    /// Attempts to mint the next ID without blocking.
    ///
    /// The state lock is only tried, so this returns immediately even while
    /// another caller waits for the clock.
    ///
    /// # Returns
    /// - `Ok(IdGenStatus::Ready { id })`: a new ID is available
    /// - `Ok(IdGenStatus::Pending { yield_for, cause })`: the time to wait (in
    ///   milliseconds) before trying again; `0` with
    ///   [`PendingCause::Contended`] when the lock was held
    ///
    /// [`PendingCause::Contended`]: crate::PendingCause::Contended
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the timestamp overflows.
    ///
    /// # Example
    /// ```
    /// use linkflake::{IdGenStatus, LockSnowflakeGenerator, NodeIdentity, SystemClock};
    ///
    /// let generator =
    ///     LockSnowflakeGenerator::with_node(NodeIdentity::new(0, 0).unwrap(), SystemClock::default());
    ///
    /// let id = loop {
    ///     match generator.try_poll_id() {
    ///         Ok(IdGenStatus::Ready { id }) => break id,
    ///         Ok(IdGenStatus::Pending { yield_for, .. }) => {
    ///             std::thread::sleep(std::time::Duration::from_millis(yield_for));
    ///         }
    ///         Err(e) => panic!("Generator error: {e}"),
    ///     }
    /// };
    /// assert_eq!(id.worker_id(), 0);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        Ok(match self.clock.try_tick()? {
            Tick::Committed(state) => IdGenStatus::Ready {
                id: self.pack(state),
            },
            Tick::Pending { yield_for, cause } => IdGenStatus::Pending { yield_for, cause },
        })
    }

    fn pack(&self, state: GeneratorState) -> SnowflakeId {
        SnowflakeId::from_components(
            state.last_timestamp(),
            self.node.datacenter_id(),
            self.node.worker_id(),
            state.sequence(),
        )
    }
}

impl<T: TimeSource> SnowflakeGenerator for LockSnowflakeGenerator<T> {
    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id()
    }

    fn try_poll_id(&self) -> Result<IdGenStatus> {
        self.try_poll_id()
    }
}
