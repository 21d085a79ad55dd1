use core::time::Duration;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
///
/// The default origin of the 41-bit timestamp field. It leaves room for IDs
/// until the year 2080.
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// A trait for time sources that return a wall-clock timestamp.
///
/// This abstraction allows you to plug in the real system clock or a mocked
/// time source in tests. The unit is **milliseconds** relative to the source's
/// epoch, and readings may go backward: the generator is responsible for
/// handling that.
///
/// # Example
///
/// ```
/// use linkflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// Wall-clock time source backed by [`SystemTime`], offset from an epoch.
///
/// Unlike a monotonic timer this follows NTP corrections and manual clock
/// changes, which is exactly what the generator's rollback handling exists
/// for. Readings before the epoch saturate to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch_ms: u64,
}

impl Default for SystemClock {
    /// Constructs a clock aligned to [`TWITTER_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(TWITTER_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a clock using `epoch` (a [`Duration`] since 1970-01-01 UTC)
    /// as t = 0.
    ///
    /// `epoch` must not be in the future. Until it passes every reading is 0,
    /// so a generator on this clock stalls after the first 4096 IDs.
    ///
    /// # Panics
    ///
    /// In debug builds, if `epoch` is later than the current time.
    pub fn with_epoch(epoch: Duration) -> Self {
        let epoch_ms = epoch.as_millis() as u64;
        debug_assert!(
            epoch_ms <= unix_millis(),
            "epoch {epoch_ms}ms is in the future"
        );
        Self { epoch_ms }
    }

    /// The origin this clock counts from.
    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_ms)
    }
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        unix_millis().saturating_sub(self.epoch_ms)
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
