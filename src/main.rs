// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Link-in-bio profile gate service
//!
//! Platform request handlers call this service before doing guarded work
//! and when saving or displaying media links:
//!
//! - `POST /limits/{comment,ai,view,click}`: take one token, 429 when empty
//! - `POST /embed/resolve`: classify a media URL
//! - `GET /embed/search?q=`: provider search links
//! - `GET /links/icon?url=`: icon for a profile link
//! - `POST /bio/render`: render a bio to HTML
//!
//! ## Configuration
//!
//! Configuration is loaded from `.env`, an optional JSON file named by
//! `LINKPAGE_CONFIG`, and environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `COMMENT_CAPACITY`, `COMMENT_REFILL`, `COMMENT_WINDOW_MS`, and the same
//!   for `AI_`, `VIEW_` and `CLICK_`
//! - `SWEEP_INTERVAL_SECS`: idle bucket sweep period (default: 60)
//! - `BUCKET_IDLE_WINDOWS`: windows of idleness before eviction (default: 5)
//! - `MAX_BUCKETS`: per-surface bucket cap, 0 for none (default: 100000)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linkpage_gate::{config::Config, handlers::{router, AppState}};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        comment_capacity = config.limits.comment.capacity,
        ai_capacity = config.limits.ai.capacity,
        view_capacity = config.limits.view.capacity,
        click_capacity = config.limits.click.capacity,
        sweep_interval_secs = config.sweep.interval_secs,
        "Starting profile gate"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    // Spawn sweep task
    let sweep_state = state.clone();
    let sweep_interval = config.sweep.interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let evicted = sweep_state.sweep();
            debug!(evicted, "Idle bucket sweep");
        }
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
