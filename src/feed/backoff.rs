use std::time::Duration;

use tracing::warn;

/// Reconnection policy for the price feed.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    pub multiplier: f64,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    /// Random spread applied to each delay, as a fraction (0.5 = ±50%).
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(3000),
            multiplier: 2.0,
            max_retries: None,
            jitter: 0.5,
        }
    }
}

#[derive(Debug)]
pub struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay before the next attempt, or `None` once retries are exhausted.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self
            .config
            .max_retries
            .is_some_and(|max| self.attempt >= max)
        {
            warn!(attempts = self.attempt, "Reconnection attempts exhausted");
            return None;
        }

        let floor = self.config.initial_delay.as_millis() as f64;
        let ceiling = self.config.max_delay.as_millis() as f64;
        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let mut delay = (floor * self.config.multiplier.powi(exponent)).min(ceiling);

        if self.config.jitter > 0.0 {
            let spread = delay * self.config.jitter;
            delay += rand::random_range(-spread..=spread);
        }

        self.attempt = self.attempt.saturating_add(1);
        let delay = delay.clamp(floor.min(ceiling), ceiling);
        Some(Duration::from_millis(delay as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReconnectConfig {
        ReconnectConfig {
            jitter: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_grows_to_ceiling() {
        let mut backoff = Backoff::new(config());
        let delays: Vec<u128> = (0..6)
            .map(|_| backoff.next_delay().unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 3000, 3000, 3000]);
        assert_eq!(backoff.attempt(), 6);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(config());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut backoff = Backoff::new(config());
        for _ in 0..1000 {
            assert!(backoff.next_delay().is_some());
        }
    }

    #[test]
    fn test_max_retries() {
        let mut backoff = Backoff::new(ReconnectConfig {
            max_retries: Some(2),
            ..config()
        });
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut backoff = Backoff::new(ReconnectConfig::default());
        for _ in 0..100 {
            let delay = backoff.next_delay().unwrap();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(3000));
        }
    }
}
