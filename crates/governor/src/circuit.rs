use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{info, warn};

/// Per-domain circuit breaker: closed (default) → open after `threshold`
/// consecutive failures → half-open once `cooldown` has elapsed → closed
/// again on the next success, or straight back to open on the next failure.
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    failure_counts: DashMap<String, u32>,
    open_since: DashMap<String, Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            failure_counts: DashMap::new(),
            open_since: DashMap::new(),
        }
    }

    /// Whether the circuit currently blocks requests to `domain`.
    ///
    /// Polling past the cooldown clears the open state as a side effect
    /// (the "implicit half-open" transition) — this is the only place
    /// that transition happens.
    pub fn is_open(&self, domain: &str) -> bool {
        let Some(opened_at) = self.open_since.get(domain).map(|t| *t) else {
            return false;
        };

        let elapsed = opened_at.elapsed();
        if elapsed >= self.cooldown {
            info!(domain, elapsed_s = elapsed.as_secs_f64(), "circuit half-open after cooldown");
            self.open_since.remove(domain);
            self.failure_counts.insert(domain.to_string(), 0);
            return false;
        }
        true
    }

    /// Record a success: zero the failure counter and close the circuit
    /// if it was open (or half-open).
    pub fn record_success(&self, domain: &str) {
        self.failure_counts.insert(domain.to_string(), 0);
        if self.open_since.remove(domain).is_some() {
            info!(domain, "circuit closed after recovery");
        }
    }

    /// Record a failure. Opens the circuit once `threshold` consecutive
    /// failures accumulate.
    pub fn record_failure(&self, domain: &str) {
        let mut count = self.failure_counts.entry(domain.to_string()).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.open_since.insert(domain.to_string(), Instant::now());
            warn!(
                domain,
                failures = *count,
                cooldown_s = self.cooldown.as_secs_f64(),
                "circuit OPEN"
            );
        }
    }

    /// Current status as a pure function of state and elapsed time — no
    /// side effects, unlike `is_open`.
    pub fn get_status(&self, domain: &str) -> &'static str {
        match self.open_since.get(domain) {
            Some(opened_at) => {
                if opened_at.elapsed() >= self.cooldown {
                    "half-open"
                } else {
                    "open"
                }
            }
            None => "closed",
        }
    }
}
