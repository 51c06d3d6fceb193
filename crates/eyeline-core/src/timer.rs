use std::time::{Duration, Instant};

/// Length of the current unbroken run of positive decisions.
///
/// Started by the first `true` decision of a run and cleared by any `false`
/// decision; a `false` frame resets the duration to zero, it does not pause it.
#[derive(Debug, Clone, Default)]
pub struct ContactTimer {
    started_at: Option<Instant>,
}

impl ContactTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this frame's decision and return the streak duration at `now`.
    pub fn update(&mut self, decision: bool, now: Instant) -> Duration {
        if !decision {
            if self.started_at.take().is_some() {
                tracing::trace!("contact streak ended");
            }
            return Duration::ZERO;
        }

        let started = *self.started_at.get_or_insert(now);
        now.saturating_duration_since(started)
    }

    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn reset(&mut self) {
        self.started_at = None;
    }
}

/// Maps capture timestamps in milliseconds onto `Instant`s.
///
/// The first timestamp lands on `base`; later ones are offset from it, so any
/// monotonic client clock works. A timestamp earlier than the latest one seen
/// holds the latest time.
#[derive(Debug, Clone)]
pub struct CaptureClock {
    base: Instant,
    first_ms: Option<u64>,
    latest_ms: u64,
}

impl CaptureClock {
    pub fn new(base: Instant) -> Self {
        Self {
            base,
            first_ms: None,
            latest_ms: 0,
        }
    }

    /// Whether `t_ms` is earlier than the latest timestamp seen.
    pub fn is_behind(&self, t_ms: u64) -> bool {
        self.first_ms.is_some() && t_ms < self.latest_ms
    }

    pub fn at(&mut self, t_ms: u64) -> Instant {
        let first = *self.first_ms.get_or_insert(t_ms);
        self.latest_ms = self.latest_ms.max(t_ms).max(first);
        let offset = Duration::from_millis(self.latest_ms - first);
        self.base.checked_add(offset).unwrap_or(self.base)
    }

    pub fn latest_ms(&self) -> Option<u64> {
        self.first_ms.map(|_| self.latest_ms)
    }
}
