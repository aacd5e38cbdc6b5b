use std::time::Duration;

use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Rolling ticks-per-second counter. Display only.
#[derive(Debug, Default, Clone)]
pub struct RateCounter {
    window_start: Option<Instant>,
    count: u64,
    rate: u32,
}

impl RateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tick at `now`; the rate is refreshed once per second.
    pub fn tick(&mut self, now: Instant) {
        let start = *self.window_start.get_or_insert(now);
        self.count += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= WINDOW {
            self.rate = ((self.count as f64 * 1000.0) / elapsed.as_millis() as f64).round() as u32;
            self.count = 0;
            self.window_start = Some(now);
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_over_one_second() {
        let start = Instant::now();
        let mut counter = RateCounter::new();
        for i in 0..=60u64 {
            counter.tick(start + Duration::from_millis(i * 1000 / 60));
        }
        assert_eq!(counter.rate(), 61);
    }

    #[test]
    fn test_no_rate_before_first_window() {
        let start = Instant::now();
        let mut counter = RateCounter::new();
        counter.tick(start);
        counter.tick(start + Duration::from_millis(500));
        assert_eq!(counter.rate(), 0);

        counter.reset();
        assert_eq!(counter.rate(), 0);
    }
}
