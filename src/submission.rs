// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form submission and its screening rules.
//!
//! Fields are kept as raw JSON values until screening. The honeypot check
//! runs first, so a bot that fills `company` is told everything went fine
//! whatever else it sent, including fields of the wrong type.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Body is not a JSON object: {0}")]
    Malformed(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactSubmission {
    pub email: Value,
    pub message: Value,
    /// Honeypot, hidden from human visitors.
    pub company: Value,
}

/// What to do with a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition<'a> {
    /// Honeypot filled; accept silently and send nothing.
    Spam,
    /// Required field missing, empty or not a string.
    Invalid(ValidationError),
    /// Forward to the mailer.
    Deliver { email: &'a str, message: &'a str },
}

impl ContactSubmission {
    /// Parse a request body. The content type is not consulted.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;

        match value {
            Value::Object(mut fields) => {
                let mut take = |key: &str| fields.remove(key).unwrap_or(Value::Null);
                Ok(Self {
                    email: take("email"),
                    message: take("message"),
                    company: take("company"),
                })
            }
            other => Err(ValidationError::Malformed(format!(
                "expected object, got {}",
                kind(&other)
            ))),
        }
    }

    pub fn is_spam(&self) -> bool {
        truthy(&self.company)
    }

    /// Screen the submission.
    pub fn disposition(&self) -> Disposition<'_> {
        if self.is_spam() {
            debug!("Honeypot field filled");
            return Disposition::Spam;
        }

        let Some(email) = non_empty(&self.email) else {
            return Disposition::Invalid(ValidationError::MissingField("email"));
        };

        let Some(message) = non_empty(&self.message) else {
            return Disposition::Invalid(ValidationError::MissingField("message"));
        };

        Disposition::Deliver { email, message }
    }
}

/// Anything other than null, false, 0, "", [] or {}.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn non_empty(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
