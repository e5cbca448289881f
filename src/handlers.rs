// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay.
//!
//! Request path: trace → CORS → per-IP rate limit → [`contact`].

use crate::config::{Config, CorsConfig};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::mailer::{Mailer, OutboundEmail};
use crate::submission::{ContactSubmission, Disposition};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub mailer: Arc<dyn Mailer>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            limiter: RateLimiter::new(config.rate_limit.clone()),
            mailer,
            config,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

/// Success response body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

fn error(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn ok(status: &'static str) -> Response {
    (StatusCode::OK, Json(StatusResponse { status })).into_response()
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let contact_routes = Router::new()
        .route("/api/contact", post(contact))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(contact_routes)
        .route("/health", get(health))
        .route("/healthz", get(health))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy: configured origins, `POST` only, any request header.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let list: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST])
        .allow_headers(Any)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Relay a contact form submission to the configured mailbox.
///
/// The body is parsed as JSON whatever the `Content-Type`, since browsers
/// posting `text/plain` skip the CORS preflight.
pub async fn contact(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let submission = match ContactSubmission::from_slice(&body) {
        Ok(submission) => submission,
        Err(err) => {
            debug!(error = %err, "Unreadable contact payload");
            return error(StatusCode::BAD_REQUEST, "Invalid input");
        }
    };

    let (email, message) = match submission.disposition() {
        Disposition::Spam => {
            info!("Honeypot triggered, dropping submission");
            return ok("ok");
        }
        Disposition::Invalid(err) => {
            debug!(error = %err, "Rejected contact submission");
            return error(StatusCode::BAD_REQUEST, "Invalid input");
        }
        Disposition::Deliver { email, message } => (email, message),
    };

    let outbound = OutboundEmail::contact(&state.config.mail, email, message);

    match state.mailer.send(&outbound).await {
        Ok(()) => {
            info!("Contact submission relayed");
            ok("sent")
        }
        Err(err) => {
            warn!(error = %err, "Failed to relay contact submission");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Email failed")
        }
    }
}

/// Per-IP rate limiting in front of the contact route.
///
/// Over-limit requests never reach the handler.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request, state.config.rate_limit.trust_forwarded_for);

    match state.limiter.check_ip(ip).await {
        RateLimitResult::Allowed { remaining, .. } => {
            debug!(%ip, remaining, "Request allowed");
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(state.limiter.limit()));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
        RateLimitResult::Limited { retry_after } => {
            let retry_secs = ceil_secs(retry_after);
            info!(%ip, retry_after_secs = retry_secs, "Request rate limited");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_secs.to_string())],
                Json(ErrorResponse {
                    error: "Too many requests",
                }),
            )
                .into_response()
        }
    }
}

/// Address used as the rate limit key.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` hop is used when
/// it parses; otherwise the TCP peer address.
pub fn client_ip(request: &Request, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

fn ceil_secs(d: Duration) -> u64 {
    (d.as_secs() + u64::from(d.subsec_nanos() > 0)).max(1)
}
