// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Link-in-bio profile gate
//!
//! This crate provides the self-contained pieces that sit in front of a
//! hosted profile-page platform:
//!
//! - Per-key token bucket admission control for comment posting, AI
//!   requests, view tracking and click tracking
//! - Idle bucket eviction and a hard per-surface bucket cap
//! - Media URL classification into playable audio or external providers
//! - Provider search links, link icon inference and bio rendering
//!
//! Limiter state is in-memory and per-process. Storage, auth and page
//! rendering live with the platform.

pub mod bio;
pub mod clock;
pub mod config;
pub mod embed;
pub mod error;
pub mod guards;
pub mod handlers;
pub mod icon;
pub mod limiter;
pub mod metrics;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{BucketConfig, Config};
pub use embed::{EmbedClassification, EmbedResolver, Provider};
pub use guards::{Guards, Surface};
pub use limiter::{RateLimitResult, RateLimiter};
