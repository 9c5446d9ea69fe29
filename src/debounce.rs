use std::time::{Duration, Instant};

/// Holds the latest queued value until it has been quiet for `delay`.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub const fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Queues `value`, restarting the quiet period.
    pub fn queue(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Returns the pending value once the quiet period has elapsed.
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        let (_, queued_at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*queued_at) >= self.delay {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Takes the pending value without waiting.
    pub fn take_now(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Value waiting for the quiet period, if any.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(value, _)| value)
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
