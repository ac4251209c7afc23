/// Monotonic clock for input event timestamps.
///
/// `SystemClock` counts real time since it was created. `TestClock` only
/// moves when advanced.
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Time source for uptime-style timestamps
pub trait Clock: Send + Sync {
    /// Monotonic time since the clock's epoch
    fn uptime(&self) -> Duration;

    fn uptime_millis(&self) -> u64 {
        self.uptime().as_millis() as u64
    }
}

/// Production clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn uptime(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Test clock with manually controlled time
#[derive(Debug, Default)]
pub struct TestClock {
    now: Mutex<Duration>,
}

impl TestClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(uptime: Duration) -> Self {
        Self {
            now: Mutex::new(uptime),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

impl Clock for TestClock {
    fn uptime(&self) -> Duration {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.uptime();
        assert!(clock.uptime() >= first);
    }

    #[test]
    fn test_test_clock_advance() {
        let clock = TestClock::starting_at(Duration::from_millis(250));
        assert_eq!(clock.uptime_millis(), 250);
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.uptime_millis(), 5250);
    }

    #[test]
    fn test_clock_trait_object() {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::new());
        assert_eq!(clock.uptime(), Duration::ZERO);
    }
}
