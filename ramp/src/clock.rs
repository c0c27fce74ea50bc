use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// Wall-clock reference point of a run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunClock {
    start: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Instant `offset` after the start of the run, if representable.
    pub fn at(&self, offset: Duration) -> Option<Instant> {
        self.start.checked_add(offset)
    }
}

/// Fixed-period tick source for the scheduler loop.
pub(crate) struct Ticker {
    interval: Interval,
    period: Duration,
}

impl Ticker {
    /// NOTE: The first tick completes instantly, so the loop evaluates the curve at t=0.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.period))
    }
}
