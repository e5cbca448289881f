// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for driving the contact relay router in-process.
//!
//! Requests go through the real router and middleware stack; the email
//! provider is replaced by a [`RecordingMailer`].

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use contact_relay::{
    config::{Config, CorsConfig, MailConfig, RateLimitConfig},
    handlers::{router, AppState},
    mailer::{MailError, Mailer, OutboundEmail},
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Mailer that records every message and succeeds or fails on demand.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            Err(MailError::Rejected {
                status: 422,
                body: r#"{"message":"domain not verified"}"#.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        mail: MailConfig::new("re_test", "site@example.com", "me@example.com"),
        rate_limit: RateLimitConfig::default(),
        cors: CorsConfig::default(),
    }
}

/// Router over the given config and mailer.
pub fn app_with(config: Config, mailer: Arc<RecordingMailer>) -> Router {
    router(Arc::new(AppState::new(config, mailer)))
}

pub fn app(mailer: Arc<RecordingMailer>) -> Router {
    app_with(test_config(), mailer)
}

/// `POST /api/contact` with a raw body from the given peer address.
pub fn contact_request(peer: &str, body: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo::<SocketAddr>(peer.parse().unwrap()));
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// Send a request and return status plus parsed JSON body.
pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = send(app, request).await;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn post_contact(app: &Router, peer: &str, body: &str) -> (StatusCode, Value) {
    send_json(app, contact_request(peer, body)).await
}
