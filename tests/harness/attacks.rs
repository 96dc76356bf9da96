// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Abuse patterns replayed against the profile gate.

use linkpage_gate::config::BucketConfig;
use linkpage_gate::Surface;
use std::time::Duration;

/// Abuse pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Surface the traffic hits
    pub surface: Surface,
    /// Total number of requests to send
    pub total_requests: usize,
    /// Requests per second, in simulated time
    pub requests_per_second: f64,
    /// Number of unique IPs to simulate
    pub unique_ips: usize,
    /// Number of unique handles or user ids
    pub unique_identities: usize,
    /// Whether the identity part of the key is sent at all
    pub include_identity: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            surface: Surface::Comment,
            total_requests: 100,
            requests_per_second: 10.0,
            unique_ips: 1,
            unique_identities: 1,
            include_identity: true,
        }
    }
}

/// Predefined abuse patterns.
impl AttackConfig {
    /// One visitor spamming comments on one profile.
    pub fn comment_flood() -> Self {
        Self {
            total_requests: 200,
            requests_per_second: 20.0,
            ..Default::default()
        }
    }

    /// One visitor spreading comments across many profiles.
    pub fn comment_spray() -> Self {
        Self {
            total_requests: 200,
            requests_per_second: 20.0,
            unique_identities: 40,
            ..Default::default()
        }
    }

    /// Many IPs inflating one profile's view count.
    pub fn distributed_view_flood() -> Self {
        Self {
            surface: Surface::View,
            total_requests: 2000,
            requests_per_second: 200.0,
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// One IP hammering the click tracker.
    pub fn click_flood() -> Self {
        Self {
            surface: Surface::Click,
            total_requests: 500,
            requests_per_second: 50.0,
            ..Default::default()
        }
    }

    /// One signed-in user looping AI requests.
    pub fn ai_loop() -> Self {
        Self {
            surface: Surface::Ai,
            total_requests: 120,
            requests_per_second: 2.0,
            unique_ips: 10,
            ..Default::default()
        }
    }

    /// Comment requests that omit the handle.
    pub fn missing_identity() -> Self {
        Self {
            total_requests: 50,
            include_identity: false,
            ..Default::default()
        }
    }

    /// A visitor staying under the comment rate.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 100,
            // 1 request every 15s against 5 per minute
            requests_per_second: 1.0 / 15.0,
            ..Default::default()
        }
    }

    /// Gap between requests in simulated time.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.requests_per_second)
    }

    /// Simulated duration of the run.
    pub fn expected_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_requests as f64 / self.requests_per_second)
    }

    /// Number of distinct bucket keys the pattern produces.
    pub fn distinct_keys(&self) -> usize {
        match self.surface {
            Surface::Comment => self.unique_ips.max(1) * self.unique_identities.max(1),
            Surface::Ai => self.unique_identities.max(1),
            Surface::View | Surface::Click => self.unique_ips.max(1),
        }
    }

    /// Upper bound on admitted requests: every key starts full and then
    /// refills for the length of the run.
    pub fn max_allowed(&self, bucket: &BucketConfig) -> usize {
        let windows = self.expected_duration().as_secs_f64() / bucket.window_duration().as_secs_f64();
        let per_key = bucket.capacity as f64 + (windows * bucket.refill_per_window as f64).ceil();
        (per_key as usize * self.distinct_keys()).min(self.total_requests)
    }
}
