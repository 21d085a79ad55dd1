use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::{trace, warn};

use super::wait::Waiter;
#[cfg(not(feature = "parking-lot"))]
use crate::generator::TryLockError;
use crate::{
    Error, PendingCause, Result, SnowflakeId, TimeSource,
    generator::{Mutex, MutexGuard},
};

/// The mutable half of a generator: last committed timestamp and sequence.
///
/// Both fields are only ever updated together, as one value, under the
/// [`SequenceClock`] lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Outcome of one pass of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// The state advanced; the contained value is what was committed.
    Committed(GeneratorState),
    /// Nothing was committed. The clock must move `yield_for` ms forward.
    Pending { yield_for: u64, cause: PendingCause },
}

impl GeneratorState {
    /// Creates a state as if an ID with these fields had just been minted.
    ///
    /// A `sequence` beyond the 12-bit range is clamped to the maximum, which
    /// makes the next call in the same millisecond wait for a new one.
    pub const fn new(last_timestamp: u64, sequence: u64) -> Self {
        let sequence = if sequence > SnowflakeId::max_sequence() {
            SnowflakeId::max_sequence()
        } else {
            sequence
        };
        Self {
            last_timestamp,
            sequence,
        }
    }

    pub const fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Applies one clock reading.
    ///
    /// - `now > last`: new millisecond, sequence restarts at zero.
    /// - `now == last`: next sequence value, or pending for 1 ms when all
    ///   4096 are used.
    /// - `now < last`: the clock went backward; pending for the deficit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampOverflow`] if `now` does not fit 41 bits.
    pub fn advance(&mut self, now: u64) -> Result<Tick> {
        match now.cmp(&self.last_timestamp) {
            Ordering::Greater => {
                if now > SnowflakeId::max_timestamp() {
                    return Err(Error::TimestampOverflow { millis: now });
                }
                self.last_timestamp = now;
                self.sequence = 0;
                Ok(Tick::Committed(*self))
            }
            Ordering::Equal if self.sequence < SnowflakeId::max_sequence() => {
                self.sequence += 1;
                Ok(Tick::Committed(*self))
            }
            Ordering::Equal => Ok(Tick::Pending {
                yield_for: 1,
                cause: PendingCause::SequenceExhausted,
            }),
            Ordering::Less => Ok(Self::cold_clock_behind(now, self.last_timestamp)),
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last_timestamp: u64) -> Tick {
        Tick::Pending {
            yield_for: last_timestamp - now,
            cause: PendingCause::ClockRollback,
        }
    }
}

/// Owns the [`GeneratorState`] and the clock it is compared against.
///
/// The state sits behind a single mutex. Reading the clock, comparing it with
/// the last timestamp, bumping or resetting the sequence and committing all
/// happen while that lock is held, so two callers can never observe the same
/// state.
#[derive(Debug)]
pub struct SequenceClock<T: TimeSource> {
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<GeneratorState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<GeneratorState>,
    time: T,
}

impl<T: TimeSource> SequenceClock<T> {
    pub fn new(state: GeneratorState, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            time,
        }
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    /// A copy of the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn state(&self) -> Result<GeneratorState> {
        Ok(*self.lock()?)
    }

    /// One non-blocking pass: read the clock and advance if possible.
    ///
    /// The lock is only tried. If another caller holds it the result is
    /// pending with [`PendingCause::Contended`] and `yield_for: 0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the timestamp overflows.
    pub fn try_tick(&self) -> Result<Tick> {
        let Some(mut state) = self.try_lock()? else {
            return Ok(Tick::Pending {
                yield_for: 0,
                cause: PendingCause::Contended,
            });
        };
        let now = self.time.current_millis();
        state.advance(now)
    }

    /// Advances the state, waiting out rollbacks and exhausted milliseconds.
    ///
    /// The lock stays held while waiting: callers queue behind the waiter
    /// instead of racing it for the same millisecond. A queued caller with a
    /// deadline gives up on the lock once it passes.
    pub(crate) fn tick(&self, waiter: &Waiter<'_>) -> Result<GeneratorState> {
        let mut state = match waiter.deadline() {
            Some(_) => self.lock_bounded(waiter)?,
            None => self.lock()?,
        };
        loop {
            let now = self.time.current_millis();
            match state.advance(now)? {
                Tick::Committed(committed) => return Ok(committed),
                Tick::Pending { yield_for, cause } => {
                    #[cfg(feature = "tracing")]
                    match cause {
                        PendingCause::ClockRollback => warn!(
                            behind_ms = yield_for,
                            last_timestamp = state.last_timestamp(),
                            now,
                            "clock rollback detected, waiting for the clock to catch up"
                        ),
                        PendingCause::SequenceExhausted => trace!(
                            last_timestamp = state.last_timestamp(),
                            "sequence exhausted, waiting for the next millisecond"
                        ),
                        PendingCause::Contended => {}
                    }
                    #[cfg(not(feature = "tracing"))]
                    let _ = cause;

                    waiter.wait_until(&self.time, now + yield_for)?;
                }
            }
        }
    }

    /// Takes the lock, retrying through `waiter` so that its deadline and
    /// interrupt apply while another caller holds it.
    fn lock_bounded(&self, waiter: &Waiter<'_>) -> Result<MutexGuard<'_, GeneratorState>> {
        let mut attempt = 0;
        loop {
            if let Some(guard) = self.try_lock()? {
                return Ok(guard);
            }
            waiter.backoff(attempt)?;
            attempt = attempt.saturating_add(1);
        }
    }

    fn try_lock(&self) -> Result<Option<MutexGuard<'_, GeneratorState>>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.try_lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            match self.state.try_lock() {
                Ok(guard) => Ok(Some(guard)),
                Err(TryLockError::WouldBlock) => Ok(None),
                Err(TryLockError::Poisoned(poisoned)) => Err(poisoned.into()),
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, GeneratorState>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }
}
