// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound email delivery.
//!
//! The handler only sees the [`Mailer`] trait. [`ResendMailer`] is the
//! production implementation, posting to the Resend HTTP API.

use crate::config::MailConfig;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Subject line used for every relayed submission.
pub const SUBJECT: &str = "New Contact Form Submission";

/// Failure to hand a message to the provider.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A fully built message, ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutboundEmail {
    /// Build the notification for a contact submission.
    ///
    /// Values are interpolated verbatim unless `escape_html` is set, so a
    /// submitter can inject markup into the rendered email by default.
    pub fn contact(config: &MailConfig, email: &str, message: &str) -> Self {
        let (email, message) = if config.escape_html {
            (escape_html(email), escape_html(message))
        } else {
            (email.to_string(), message.to_string())
        };

        Self {
            from: config.from.clone(),
            to: config.to.clone(),
            subject: SUBJECT.to_string(),
            html: format!("<p><strong>Email:</strong> {email}</p><p>{message}</p>"),
        }
    }
}

/// Sends outbound email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// [`Mailer`] backed by the Resend `POST /emails` endpoint.
pub struct ResendMailer {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ResendMailer {
    /// Create a mailer from configuration.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Email accepted by provider");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
