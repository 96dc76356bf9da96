// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for profile gate abuse simulation.
//!
//! Traffic is replayed against the guards on a manual clock, so a
//! ten-minute flood runs in milliseconds and every run is deterministic.

pub mod attacks;
pub mod generators;
pub mod metrics;
