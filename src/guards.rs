// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The guarded surfaces of a profile page and their limiters.
//!
//! Each surface owns an independent [`RateLimiter`] with its own bucket
//! parameters and its own key scheme:
//!
//! - comment posting: `<ip>:<handle>`
//! - AI writing requests: `<user id>`
//! - view tracking: `view:<ip>`
//! - click tracking: `click:<ip>`

use crate::clock::{Clock, MonotonicClock};
use crate::config::{LimitsConfig, SweepConfig};
use crate::limiter::{RateLimitResult, RateLimiter};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// A rate-limited action on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Comment,
    Ai,
    View,
    Click,
}

impl Surface {
    pub const ALL: [Surface; 4] = [Surface::Comment, Surface::Ai, Surface::View, Surface::Click];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Ai => "ai",
            Self::View => "view",
            Self::Click => "click",
        }
    }

    /// Prefix of the environment variables that configure this surface.
    pub(crate) fn env_prefix(&self) -> &'static str {
        match self {
            Self::Comment => "COMMENT",
            Self::Ai => "AI",
            Self::View => "VIEW",
            Self::Click => "CLICK",
        }
    }

    /// Build the bucket key for this surface from request identity.
    ///
    /// Returns the name of the first missing parameter on failure.
    pub fn key(
        &self,
        ip: Option<IpAddr>,
        handle: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<String, &'static str> {
        match self {
            Self::Comment => {
                let ip = ip.ok_or("ip")?;
                let handle = non_empty(handle).ok_or("handle")?;
                Ok(comment_key(ip, handle))
            }
            Self::Ai => {
                let user_id = non_empty(user_id).ok_or("user_id")?;
                Ok(user_id.to_string())
            }
            Self::View => Ok(view_key(ip.ok_or("ip")?)),
            Self::Click => Ok(click_key(ip.ok_or("ip")?)),
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Key for comment posting. Handles are case-insensitive.
pub fn comment_key(ip: IpAddr, handle: &str) -> String {
    format!("{}:{}", ip, handle.trim().to_lowercase())
}

pub fn view_key(ip: IpAddr) -> String {
    format!("view:{ip}")
}

pub fn click_key(ip: IpAddr) -> String {
    format!("click:{ip}")
}

/// One limiter per guarded surface, built once and shared with handlers.
#[derive(Debug)]
pub struct Guards {
    comment: RateLimiter,
    ai: RateLimiter,
    view: RateLimiter,
    click: RateLimiter,
}

impl Guards {
    pub fn new(limits: &LimitsConfig, sweep: &SweepConfig) -> Self {
        Self::with_clock(limits, sweep, Arc::new(MonotonicClock::default()))
    }

    /// Build all limiters on a shared clock.
    pub fn with_clock(limits: &LimitsConfig, sweep: &SweepConfig, clock: Arc<dyn Clock>) -> Self {
        let build = |surface: Surface| {
            RateLimiter::with_clock(limits.for_surface(surface), clock.clone()).with_sweep(sweep)
        };
        Self {
            comment: build(Surface::Comment),
            ai: build(Surface::Ai),
            view: build(Surface::View),
            click: build(Surface::Click),
        }
    }

    pub fn limiter(&self, surface: Surface) -> &RateLimiter {
        match surface {
            Surface::Comment => &self.comment,
            Surface::Ai => &self.ai,
            Surface::View => &self.view,
            Surface::Click => &self.click,
        }
    }

    /// Consume one token for `key` on `surface`.
    pub fn check(&self, surface: Surface, key: &str) -> RateLimitResult {
        self.limiter(surface).check(key)
    }

    pub fn allow_comment(&self, ip: IpAddr, handle: &str) -> bool {
        self.comment.try_consume(&comment_key(ip, handle))
    }

    pub fn allow_ai(&self, user_id: &str) -> bool {
        self.ai.try_consume(user_id)
    }

    pub fn allow_view(&self, ip: IpAddr) -> bool {
        self.view.try_consume(&view_key(ip))
    }

    pub fn allow_click(&self, ip: IpAddr) -> bool {
        self.click.try_consume(&click_key(ip))
    }

    /// Sweep idle buckets on every surface. Returns the total evicted.
    pub fn sweep(&self) -> usize {
        let evicted: usize = Surface::ALL
            .iter()
            .map(|surface| self.limiter(*surface).sweep())
            .sum();
        debug!(evicted, "Guard sweep complete");
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::net::Ipv4Addr;

    fn guards() -> Guards {
        Guards::with_clock(
            &LimitsConfig::default(),
            &SweepConfig::default(),
            Arc::new(ManualClock::new()),
        )
    }

    #[test]
    fn test_key_schemes() {
        let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));

        assert_eq!(
            Surface::Comment.key(Some(ip), Some(" Alice "), None).unwrap(),
            "203.0.113.7:alice"
        );
        assert_eq!(Surface::View.key(Some(ip), None, None).unwrap(), "view:203.0.113.7");
        assert_eq!(Surface::Click.key(Some(ip), None, None).unwrap(), "click:203.0.113.7");
        assert_eq!(Surface::Ai.key(None, None, Some("user-42")).unwrap(), "user-42");
    }

    #[test]
    fn test_missing_key_parts() {
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);

        assert_eq!(Surface::Comment.key(Some(ip), Some("  "), None), Err("handle"));
        assert_eq!(Surface::Comment.key(None, Some("bob"), None), Err("ip"));
        assert_eq!(Surface::Ai.key(Some(ip), None, None), Err("user_id"));
        assert_eq!(Surface::Click.key(None, None, Some("u")), Err("ip"));
    }

    #[test]
    fn test_view_and_click_buckets_are_separate() {
        let guards = guards();
        let ip = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));

        for _ in 0..30 {
            assert!(guards.allow_view(ip));
        }
        assert!(!guards.allow_view(ip));
        assert!(guards.allow_click(ip));
    }

    #[test]
    fn test_comment_limit_is_per_handle() {
        let guards = guards();
        let ip = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));

        for _ in 0..5 {
            assert!(guards.allow_comment(ip, "alice"));
        }
        assert!(!guards.allow_comment(ip, "ALICE"));
        assert!(guards.allow_comment(ip, "bob"));
    }
}
