// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Accepts contact form submissions on `POST /api/contact` and forwards
//! them to a transactional email provider:
//!
//! - Per-IP rate limiting (5 requests per 60 s window by default)
//! - Honeypot spam trap (`company` field)
//! - Required `email` and `message` fields
//! - CORS restricted to `POST`

pub mod config;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod submission;

pub use config::{Config, ConfigError};
pub use handlers::{router, AppState};
pub use limiter::{RateLimitResult, RateLimiter};
pub use mailer::{MailError, Mailer, OutboundEmail, ResendMailer};
pub use submission::{ContactSubmission, Disposition};
