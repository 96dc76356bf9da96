// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the profile-page gate.
//!
//! Request handlers on the platform call `/limits/{surface}` before doing the
//! guarded work and reject their own request when the answer is 429. The
//! embed, icon and bio endpoints are pure transformations.

use crate::bio;
use crate::config::Config;
use crate::embed::{self, EmbedClassification, EmbedResolver, SearchLink};
use crate::error::{ApiError, Result};
use crate::guards::{Guards, Surface};
use crate::icon::{self, LinkIcon};
use crate::limiter::RateLimitResult;
use crate::metrics::Metrics;
use axum::{
    extract::{Path, Query, State},
    http::{header, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub guards: Guards,
    pub resolver: EmbedResolver,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> std::result::Result<Self, prometheus::Error> {
        Ok(Self {
            guards: Guards::new(&config.limits, &config.sweep),
            resolver: EmbedResolver::new(config.embed.clone()),
            metrics: Metrics::new()?,
            config,
        })
    }

    /// Sweep idle buckets and refresh the bucket gauges.
    pub fn sweep(&self) -> usize {
        let evicted = self.guards.sweep();
        self.metrics.observe_buckets(&self.guards);
        evicted
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub time: String,
}

/// Identity parts a surface builds its bucket key from.
#[derive(Debug, Default, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Rate limit check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub surface: Surface,
    pub remaining: u32,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct IconQuery {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub html: String,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/limits/:surface", post(check_limit))
        .route("/embed/resolve", post(resolve_embed))
        .route("/embed/search", get(search))
        .route("/links/icon", get(link_icon))
        .route("/bio/render", post(render_bio));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "linkpage-gate",
        version: env!("CARGO_PKG_VERSION"),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

/// Take one token on `surface` for the identity in the body.
pub async fn check_limit(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<Surface>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>> {
    let ip = parse_ip(req.ip.as_deref())?;
    let key = surface
        .key(ip, req.handle.as_deref(), req.user_id.as_deref())
        .map_err(|param| {
            warn!(%surface, param, "Missing key parameter");
            ApiError::MissingParameter(param)
        })?;

    let result = state.guards.check(surface, &key);
    state.metrics.record_decision(surface, result.is_allowed());

    match result {
        RateLimitResult::Allowed { remaining } => {
            debug!(%surface, key = %key, remaining, "Request allowed");
            Ok(Json(CheckResponse {
                allowed: true,
                surface,
                remaining,
            }))
        }
        RateLimitResult::Limited { retry_after } => {
            info!(
                %surface,
                key = %key,
                retry_after_ms = retry_after.as_millis() as u64,
                "Request rate limited"
            );
            Err(ApiError::RateLimited {
                surface,
                retry_after,
            })
        }
    }
}

fn parse_ip(raw: Option<&str>) -> Result<Option<IpAddr>> {
    match raw.map(str::trim).filter(|ip| !ip.is_empty()) {
        None => Ok(None),
        Some(ip) => ip.parse().map(Some).map_err(|_| {
            warn!(ip, "Invalid IP address format");
            ApiError::InvalidIp(ip.to_string())
        }),
    }
}

/// Classify a media URL.
pub async fn resolve_embed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveRequest>,
) -> Json<EmbedClassification> {
    let classification = state.resolver.resolve(&req.url);
    state.metrics.record_classification(classification.provider);
    debug!(provider = %classification.provider, "Classified embed URL");
    Json(classification)
}

/// Provider search links for a free-text query.
pub async fn search(Query(query): Query<SearchQuery>) -> Json<Vec<SearchLink>> {
    Json(embed::search_links(&query.q))
}

/// Icon for a profile link.
pub async fn link_icon(Query(query): Query<IconQuery>) -> Json<LinkIcon> {
    Json(icon::link_icon(&query.url))
}

/// Render a bio to HTML.
pub async fn render_bio(Json(req): Json<RenderRequest>) -> Json<RenderResponse> {
    Json(RenderResponse {
        html: bio::render(&req.text),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    state.metrics.observe_buckets(&state.guards);
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
