use std::time::{Duration, Instant};

/// Cancellable fixed-delay repeating task.
///
/// The owner polls it from its event loop; after running an iteration it
/// calls [`RepeatingTask::reschedule`], so the next run is one period after
/// the previous one *finished*. Cancellation only takes effect between
/// iterations.
#[derive(Debug, Clone)]
pub struct RepeatingTask {
    period: Duration,
    next_due: Option<Instant>,
}

impl RepeatingTask {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arms the task with its first iteration due immediately.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// True when the task is armed and its iteration is due.
    pub fn poll(&self, now: Instant) -> bool {
        matches!(self.next_due, Some(due) if now >= due)
    }

    /// Re-arms one period after `finished`. No-op once cancelled.
    pub fn reschedule(&mut self, finished: Instant) {
        if self.next_due.is_some() {
            self.next_due = Some(finished + self.period);
        }
    }

    /// Delay until the next iteration; `None` when cancelled.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
