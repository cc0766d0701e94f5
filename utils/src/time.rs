//! Time utilities.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};

pub use tokio::time::sleep;

/// Periodic timer that waits one full period before the first tick.
pub struct Interval(tokio::time::Interval);

impl Interval {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Interval(interval)
    }

    pub async fn tick(&mut self) -> Instant {
        self.0.tick().await
    }
}
