use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Cloneable switch that aborts clock waits of the generator it came from.
///
/// Once [`interrupt`](Self::interrupt) is called, every wait in progress and
/// every later one fails with [`Error::Interrupted`] until
/// [`reset`](Self::reset). Calls that need no wait still succeed.
///
/// ```
/// use linkflake::{LockSnowflakeGenerator, NodeIdentity, SystemClock};
///
/// let generator =
///     LockSnowflakeGenerator::with_node(NodeIdentity::new(0, 0).unwrap(), SystemClock::default());
/// let handle = generator.interrupt_handle();
/// handle.interrupt();
/// assert!(handle.is_interrupted());
/// handle.reset();
/// assert!(!handle.is_interrupted());
/// ```
///
/// [`Error::Interrupted`]: crate::Error::Interrupted
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
