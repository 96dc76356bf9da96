// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for abuse simulation results.

use std::collections::HashMap;
use std::time::Duration;

/// Collects outcomes during a simulation run.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Admitted requests by bucket key
    allowed_per_key: HashMap<String, usize>,
    /// Simulated time covered by the run
    simulated: Duration,
    /// Wall-clock cost of each decision (microseconds)
    latencies: Vec<u64>,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    Limited,
    MissingKey,
}

impl AttackMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, key: Option<&str>, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if let (Outcome::Allowed, Some(key)) = (outcome, key) {
            *self.allowed_per_key.entry(key.to_string()).or_insert(0) += 1;
        }
        self.latencies.push(latency.as_micros() as u64);
    }

    /// Add simulated time.
    pub fn elapse(&mut self, by: Duration) {
        self.simulated += by;
    }

    /// Get total request count.
    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Get block rate (ratio of blocked to total).
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    /// Most requests any single key got through.
    pub fn max_allowed_per_key(&self) -> usize {
        self.allowed_per_key.values().copied().max().unwrap_or(0)
    }

    /// Get p99 latency in microseconds.
    pub fn p99_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let idx = (sorted.len() as f64 * 0.99) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            limited: self.count(Outcome::Limited),
            missing_key: self.count(Outcome::MissingKey),
            simulated_secs: self.simulated.as_secs_f64(),
            block_rate: self.block_rate(),
            p99_latency_us: self.p99_latency_us(),
            admitted_keys: self.allowed_per_key.len(),
            max_allowed_per_key: self.max_allowed_per_key(),
        }
    }
}

/// Summary report of a simulation run.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub limited: usize,
    pub missing_key: usize,
    pub simulated_secs: f64,
    pub block_rate: f64,
    pub p99_latency_us: u64,
    pub admitted_keys: usize,
    pub max_allowed_per_key: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Abuse Simulation Report ===")?;
        writeln!(f, "Simulated:         {:.1} s", self.simulated_secs)?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f, "Allowed:           {}", self.allowed)?;
        writeln!(f, "Rate Limited:      {}", self.limited)?;
        writeln!(f, "Missing Key:       {}", self.missing_key)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "P99:               {} us", self.p99_latency_us)?;
        writeln!(f, "Admitted Keys:     {}", self.admitted_keys)?;
        writeln!(f, "Max per Key:       {}", self.max_allowed_per_key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, Some("a"), Duration::from_micros(100));
        metrics.record(Outcome::Allowed, Some("a"), Duration::from_micros(150));
        metrics.record(Outcome::Limited, Some("a"), Duration::from_micros(50));
        metrics.record(Outcome::MissingKey, None, Duration::ZERO);

        assert_eq!(metrics.total_requests(), 4);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.max_allowed_per_key(), 2);
        assert!((metrics.block_rate() - 0.5).abs() < 0.01);
    }
}
