use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Wall-clock tick source owned by one recording session.
///
/// The first tick fires one `period` after start. Dropping the timer stops it.
pub(crate) struct RecordingTimer {
    interval: Interval,
}

impl RecordingTimer {
    pub(crate) fn start(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { interval }
    }

    /// Wait for the next tick. Cancel-safe.
    pub(crate) async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
