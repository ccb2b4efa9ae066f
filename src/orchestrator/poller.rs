//! Fixed-interval, bounded auto-refresh timer.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// At most one interval exists at a time; `start` always replaces the previous one.
pub(crate) struct Poller {
    period: Duration,
    max_ticks: u32,
    ticks: u32,
    interval: Option<Interval>,
}

impl Poller {
    /// A zero period is raised to one millisecond; tokio intervals need a non-zero period.
    pub fn new(period: Duration, max_ticks: u32) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            max_ticks,
            ticks: 0,
            interval: None,
        }
    }

    pub fn start(&mut self) {
        self.stop();
        self.ticks = 0;
        // First tick one full period after start, not immediately.
        let mut iv = interval_at(Instant::now() + self.period, self.period);
        iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(iv);
    }

    /// Cancel future ticks. Returns whether a timer was running.
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    pub fn exhausted(&self) -> bool {
        self.ticks >= self.max_ticks
    }

    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    /// Wait for the next tick and return its 1-based number. Never resolves while stopped.
    pub async fn tick(&mut self) -> u32 {
        match self.interval.as_mut() {
            Some(iv) => {
                iv.tick().await;
                self.ticks += 1;
                self.ticks
            }
            None => futures::future::pending().await,
        }
    }
}
