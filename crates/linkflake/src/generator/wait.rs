use core::time::Duration;
use std::{thread, time::Instant};

use crate::{Error, InterruptHandle, Result, TimeSource};

/// Deficits larger than this are slept off; the last stretch is spun.
pub const SPIN_THRESHOLD: Duration = Duration::from_millis(2);

/// Longest single sleep. Bounds how late an interrupt is noticed.
pub const MAX_SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Failed attempts on a held lock that are spun before sleeping between
/// attempts.
const LOCK_SPIN_ATTEMPTS: u32 = 64;

/// Sleep between attempts on a lock held by a caller that is itself waiting.
const LOCK_RETRY_SLICE: Duration = Duration::from_micros(200);

/// Blocks a generator call until its clock catches up.
///
/// Long deficits (a clock rollback) are mostly slept, leaving about a
/// millisecond to spin so the wake-up lands close to the target. Short ones
/// (sequence exhaustion) are spun with a yield. The interrupt flag and the
/// optional deadline are checked before every step.
pub(crate) struct Waiter<'a> {
    interrupt: &'a InterruptHandle,
    deadline: Option<Instant>,
    started: Instant,
}

impl<'a> Waiter<'a> {
    pub(crate) fn new(interrupt: &'a InterruptHandle, deadline: Option<Instant>) -> Self {
        Self {
            interrupt,
            deadline,
            started: Instant::now(),
        }
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Pauses before the next attempt on a lock another caller holds.
    ///
    /// Short holds (a plain commit) are spun through; long ones (another
    /// caller waiting for the clock) are slept through in small slices.
    pub(crate) fn backoff(&self, attempt: u32) -> Result<()> {
        if self.interrupt.is_interrupted() {
            return Err(Error::Interrupted);
        }

        let until_deadline = self.until_deadline()?;
        if attempt < LOCK_SPIN_ATTEMPTS {
            core::hint::spin_loop();
            thread::yield_now();
        } else {
            thread::sleep(LOCK_RETRY_SLICE.min(until_deadline));
        }
        Ok(())
    }

    /// Time left before the deadline, or [`Error::ClockTimeout`] once it has
    /// passed.
    fn until_deadline(&self) -> Result<Duration> {
        match self.deadline {
            Some(deadline) => {
                let instant = Instant::now();
                if instant >= deadline {
                    Err(Error::ClockTimeout {
                        waited_ms: self.started.elapsed().as_millis() as u64,
                    })
                } else {
                    Ok(deadline - instant)
                }
            }
            None => Ok(Duration::MAX),
        }
    }

    /// Returns once `time` reads at least `target`.
    pub(crate) fn wait_until(&self, time: &impl TimeSource, target: u64) -> Result<()> {
        loop {
            if self.interrupt.is_interrupted() {
                return Err(Error::Interrupted);
            }

            let now = time.current_millis();
            if now >= target {
                return Ok(());
            }

            let until_deadline = self.until_deadline()?;

            let deficit = Duration::from_millis(target - now);
            if deficit > SPIN_THRESHOLD {
                let nap = (deficit - Duration::from_millis(1))
                    .min(MAX_SLEEP_SLICE)
                    .min(until_deadline);
                thread::sleep(nap);
            } else {
                core::hint::spin_loop();
                thread::yield_now();
            }
        }
    }
}
