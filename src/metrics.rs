// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for limiter decisions and embed classifications.

use crate::embed::Provider;
use crate::guards::{Guards, Surface};
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// Service metrics on a private registry.
pub struct Metrics {
    registry: Registry,
    decisions: IntCounterVec,
    classifications: IntCounterVec,
    buckets: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new(
                "linkpage_limit_decisions_total",
                "Rate limit decisions by surface and outcome",
            ),
            &["surface", "outcome"],
        )?;
        let classifications = IntCounterVec::new(
            Opts::new(
                "linkpage_embed_classifications_total",
                "Embed URL classifications by provider",
            ),
            &["provider"],
        )?;
        let buckets = IntGaugeVec::new(
            Opts::new("linkpage_buckets", "Live token buckets by surface"),
            &["surface"],
        )?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(classifications.clone()))?;
        registry.register(Box::new(buckets.clone()))?;

        Ok(Self {
            registry,
            decisions,
            classifications,
            buckets,
        })
    }

    pub fn record_decision(&self, surface: Surface, allowed: bool) {
        let outcome = if allowed { "allowed" } else { "limited" };
        self.decisions
            .with_label_values(&[surface.as_str(), outcome])
            .inc();
    }

    pub fn record_classification(&self, provider: Provider) {
        self.classifications
            .with_label_values(&[provider.as_str()])
            .inc();
    }

    /// Refresh the live bucket gauges from `guards`.
    pub fn observe_buckets(&self, guards: &Guards) {
        for surface in Surface::ALL {
            let live = i64::try_from(guards.limiter(surface).len()).unwrap_or(i64::MAX);
            self.buckets.with_label_values(&[surface.as_str()]).set(live);
        }
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitsConfig, SweepConfig};

    #[test]
    fn test_render_contains_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_decision(Surface::Comment, true);
        metrics.record_decision(Surface::Comment, false);
        metrics.record_classification(Provider::Spotify);

        let guards = Guards::new(&LimitsConfig::default(), &SweepConfig::default());
        guards.allow_ai("user-1");
        metrics.observe_buckets(&guards);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"linkpage_limit_decisions_total{outcome="limited",surface="comment"} 1"#));
        assert!(text.contains(r#"linkpage_embed_classifications_total{provider="spotify"} 1"#));
        assert!(text.contains(r#"linkpage_buckets{surface="ai"} 1"#));
    }
}
