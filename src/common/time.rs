//! Time source abstraction for the room clock.
//!
//! The engine never reads wall-clock time directly; everything that needs
//! "now" goes through the injected [`Clock`], so tests can drive time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current time in seconds. Monotonic within one clock instance.
    fn now(&self) -> f64;
}

/// System clock implementation (seconds elapsed since the clock was created)
#[derive(Debug)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    /// Create a clock that starts counting from zero now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Manually driven clock for testing (time only moves when told to)
#[derive(Debug)]
pub struct ManualClock {
    // f64 seconds stored as raw bits so the clock can be shared without a lock
    now_bits: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock starting at the given time in seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now_bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// Jump the clock to an absolute time in seconds.
    pub fn set(&self, time: f64) {
        self.now_bits.store(time.to_bits(), Ordering::Release);
    }

    /// Move the clock forward by the given number of seconds.
    pub fn advance(&self, delta: f64) {
        self.set(self.now() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_starts_near_zero() {
        // テスト項目: SystemClock が生成直後はほぼ 0 を返す
        // given (前提条件):
        let clock = SystemClock::new();

        // when (操作):
        let now = clock.now();

        // then (期待する結果):
        assert!(now >= 0.0);
        assert!(now < 1.0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        // テスト項目: SystemClock が単調増加する値を返す
        // given (前提条件):
        let clock = SystemClock::new();

        // when (操作):
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = clock.now();

        // then (期待する結果):
        assert!(second >= first);
    }

    #[test]
    fn test_manual_clock_returns_start_time() {
        // テスト項目: ManualClock が指定した開始時刻を返す
        // given (前提条件):
        let clock = ManualClock::new(1.5);

        // when (操作):
        let now = clock.now();

        // then (期待する結果):
        assert_eq!(now, 1.5);
    }

    #[test]
    fn test_manual_clock_set_and_advance() {
        // テスト項目: ManualClock の set / advance で時刻を操作できる
        // given (前提条件):
        let clock = ManualClock::new(0.0);

        // when (操作):
        clock.set(10.0);
        clock.advance(0.5);

        // then (期待する結果):
        assert_eq!(clock.now(), 10.5);
    }

    #[test]
    fn test_manual_clock_is_stable_between_operations() {
        // テスト項目: ManualClock は操作しない限り同じ時刻を返し続ける
        // given (前提条件):
        let clock = ManualClock::new(42.0);

        // when (操作):
        let first = clock.now();
        let second = clock.now();

        // then (期待する結果):
        assert_eq!(first, 42.0);
        assert_eq!(second, 42.0);
    }
}
