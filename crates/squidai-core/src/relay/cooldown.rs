//! Minimum-interval gate.
//!
//! The server uses one gate for the whole process to space out upstream
//! calls; the chat controller uses its own as an advisory send lockout.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Tracks when the gate was last armed and how long it stays closed.
#[derive(Debug)]
pub struct CooldownGate {
    window: Duration,
    armed_at: Mutex<Option<Instant>>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_at: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time left before the gate opens, or `None` if it is open.
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining_at(Instant::now())
    }

    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        let armed_at = *self.armed_at.lock().unwrap_or_else(PoisonError::into_inner);
        Self::left(armed_at, self.window, now)
    }

    /// Close the gate for one window starting now.
    pub fn arm(&self) {
        self.arm_at(Instant::now());
    }

    pub fn arm_at(&self, now: Instant) {
        *self.armed_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(now);
    }

    /// Pass through the gate if open, closing it behind the caller.
    ///
    /// Check and re-arm happen under one lock, so of two concurrent callers
    /// at most one is admitted. On rejection returns the time left.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut armed_at = self.armed_at.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(left) = Self::left(*armed_at, self.window, now) {
            return Err(left);
        }
        *armed_at = Some(now);
        Ok(())
    }

    /// Open the gate immediately.
    pub fn reset(&self) {
        *self.armed_at.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn left(armed_at: Option<Instant>, window: Duration, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(armed_at?);
        (elapsed < window).then(|| window - elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_acquire_passes() {
        let gate = CooldownGate::new(Duration::from_secs(5));
        assert!(gate.try_acquire().is_ok());
    }

    #[test]
    fn test_second_acquire_within_window_reports_remaining() {
        let gate = CooldownGate::new(Duration::from_secs(5));
        let t0 = Instant::now();
        gate.try_acquire_at(t0).unwrap();

        let remaining = gate.try_acquire_at(t0 + Duration::from_millis(1800)).unwrap_err();
        assert_eq!(remaining, Duration::from_millis(3200));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let gate = CooldownGate::new(Duration::from_secs(5));
        let t0 = Instant::now();
        gate.try_acquire_at(t0).unwrap();
        assert!(gate.try_acquire_at(t0 + Duration::from_secs(4)).is_err());
        assert!(gate.try_acquire_at(t0 + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_arm_and_reset() {
        let gate = CooldownGate::new(Duration::from_secs(2));
        assert!(gate.remaining().is_none());

        let t0 = Instant::now();
        gate.arm_at(t0);
        assert_eq!(
            gate.remaining_at(t0 + Duration::from_millis(500)),
            Some(Duration::from_millis(1500))
        );

        gate.reset();
        assert!(gate.remaining().is_none());
    }

    #[test]
    fn test_zero_window_never_blocks() {
        let gate = CooldownGate::new(Duration::ZERO);
        assert!(gate.try_acquire().is_ok());
        assert!(gate.try_acquire().is_ok());
    }
}
