use std::time::Duration;
use tokio::time::Instant;

/// Spacing between reconnection attempts.
///
/// Starts at `min`, doubles after each failure up to `max`, and resets once an
/// attempt succeeds. The deadline is stored rather than slept on directly, so
/// a receive that is cancelled mid-wait resumes the same wait.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
    next_attempt: Option<Instant>,
}

impl ReconnectBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: min,
            next_attempt: None,
        }
    }

    /// When the next attempt may run, if a failure is pending.
    pub fn next_attempt(&self) -> Option<Instant> {
        self.next_attempt
    }

    /// Record a failed attempt and return the wait before the next one.
    pub fn on_failure(&mut self) -> Duration {
        let wait = self.current;
        self.next_attempt = Some(Instant::now() + wait);
        self.current = (self.current * 2).min(self.max);
        wait
    }

    pub fn on_success(&mut self) {
        self.current = self.min;
        self.next_attempt = None;
    }

    pub fn is_failing(&self) -> bool {
        self.next_attempt.is_some()
    }
}
