use std::time::Duration;

const FLOOR: Duration = Duration::from_secs(1);
const CEILING: Duration = Duration::from_secs(30);

/// The delays between polls of a queued report.
///
/// The first delay is whatever the caller asked for. After that the
/// interval is raised to at least one second, then grows by half (rounded
/// to whole seconds) on each step up to thirty seconds.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    /// Start from the given interval.
    pub fn new(initial: Duration) -> Self {
        Self { next: initial }
    }

    /// The next delay. Never runs out.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = step(current);
        current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

fn step(interval: Duration) -> Duration {
    if interval < FLOOR {
        FLOOR
    } else if interval < CEILING {
        let grown = (interval.as_secs_f64() * 1.5).round();
        Duration::from_secs_f64(grown).min(CEILING)
    } else {
        CEILING
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capped_geometric() {
        let delays: Vec<f64> = Backoff::new(Duration::from_millis(10))
            .take(11)
            .map(|d| d.as_secs_f64())
            .collect();

        assert_eq!(
            delays,
            vec![0.01, 1.0, 2.0, 3.0, 5.0, 8.0, 12.0, 18.0, 27.0, 30.0, 30.0]
        );
    }

    #[test]
    fn large_initial_interval() {
        let mut backoff = Backoff::new(Duration::from_secs(120));
        assert_eq!(backoff.next_delay(), Duration::from_secs(120));
        assert_eq!(backoff.next_delay(), CEILING);
        assert_eq!(backoff.next_delay(), CEILING);
    }

    #[test]
    fn zero_interval() {
        let mut backoff = Backoff::new(Duration::ZERO);
        assert_eq!(backoff.next_delay(), Duration::ZERO);
        assert_eq!(backoff.next_delay(), FLOOR);
    }
}
