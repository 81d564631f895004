use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::Rng;
use tracing::debug;

/// Per-domain jittered wait with multiplicative backoff.
///
/// `backoff_factor` starts at `1.0` and is nudged by `report_success` /
/// `report_error`; `wait` multiplies the jittered base delay by it. Floors
/// and ceilings are asymmetric by design: a 429/503 gets a harder ceiling
/// (10.0) than any other error (5.0) because an explicit throttling signal
/// deserves more caution than a generic failure, while recovery from
/// either should be fast once the remote signal clears.
pub struct AdaptiveDelay {
    min_delay: f64,
    max_delay: f64,
    last_request: DashMap<String, Instant>,
    backoff_factor: DashMap<String, f64>,
}

impl AdaptiveDelay {
    pub fn new(min_delay: f64, max_delay: f64) -> Self {
        Self {
            min_delay,
            max_delay,
            last_request: DashMap::new(),
            backoff_factor: DashMap::new(),
        }
    }

    fn backoff(&self, domain: &str) -> f64 {
        *self.backoff_factor.get(domain).as_deref().unwrap_or(&1.0)
    }

    fn jittered_delay(&self, domain: &str) -> Duration {
        let base = rand::thread_rng().gen_range(self.min_delay..=self.max_delay);
        Duration::from_secs_f64(base * self.backoff(domain))
    }

    /// Suspend the caller until at least `delay` has elapsed since the
    /// last completed wait for this domain, then record `now` as the new
    /// baseline.
    pub async fn wait(&self, domain: &str) {
        let delay = self.jittered_delay(domain);
        let now = Instant::now();
        let elapsed = self
            .last_request
            .get(domain)
            .map(|t| now.saturating_duration_since(*t))
            .unwrap_or(Duration::MAX);

        if elapsed < delay {
            let remaining = delay - elapsed;
            debug!(domain, wait_ms = remaining.as_millis() as u64, "throttling");
            tokio::time::sleep(remaining).await;
        }

        self.last_request.insert(domain.to_string(), Instant::now());
    }

    /// Reset backoff towards 1.0 on a successful request.
    pub fn report_success(&self, domain: &str) {
        let mut entry = self.backoff_factor.entry(domain.to_string()).or_insert(1.0);
        *entry = (*entry * 0.5).max(1.0);
    }

    /// Increase backoff on a failed request. `status` carries the HTTP
    /// status code when known; 429/503 get the harsher multiplier/ceiling.
    pub fn report_error(&self, domain: &str, status: Option<u16>) {
        let mut entry = self.backoff_factor.entry(domain.to_string()).or_insert(1.0);
        *entry = if matches!(status, Some(429) | Some(503)) {
            (*entry * 2.0).min(10.0)
        } else {
            (*entry * 1.5).min(5.0)
        };
    }

    /// Current backoff factor for a domain (for diagnostics/tests).
    pub fn backoff_factor(&self, domain: &str) -> f64 {
        self.backoff(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_introduces_a_delay() {
        let delay = AdaptiveDelay::new(0.05, 0.08);
        let start = Instant::now();
        delay.wait("example.com").await;
        delay.wait("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn backoff_doubles_on_repeated_429() {
        let delay = AdaptiveDelay::new(2.0, 7.0);
        assert_eq!(delay.backoff_factor("test.com"), 1.0);
        delay.report_error("test.com", Some(429));
        assert_eq!(delay.backoff_factor("test.com"), 2.0);
        delay.report_error("test.com", Some(429));
        assert_eq!(delay.backoff_factor("test.com"), 4.0);
    }

    #[test]
    fn backoff_caps_at_ten_for_rate_limit_signals() {
        let delay = AdaptiveDelay::new(2.0, 7.0);
        for _ in 0..10 {
            delay.report_error("test.com", Some(503));
        }
        assert_eq!(delay.backoff_factor("test.com"), 10.0);
    }

    #[test]
    fn backoff_caps_at_five_for_generic_errors() {
        let delay = AdaptiveDelay::new(2.0, 7.0);
        for _ in 0..10 {
            delay.report_error("test.com", None);
        }
        assert_eq!(delay.backoff_factor("test.com"), 5.0);
    }

    #[test]
    fn success_halves_backoff_and_floors_at_one() {
        let delay = AdaptiveDelay::new(2.0, 7.0);
        delay.report_error("test.com", Some(429));
        delay.report_error("test.com", Some(429));
        let before = delay.backoff_factor("test.com");
        delay.report_success("test.com");
        assert!(delay.backoff_factor("test.com") <= before / 2.0);
        delay.report_success("test.com");
        delay.report_success("test.com");
        assert_eq!(delay.backoff_factor("test.com"), 1.0);
    }
}
