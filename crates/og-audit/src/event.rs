// event.rs — Intercept event data model.
//
// One InterceptEvent is written per intercepted request: after the network
// call completes for forwarded requests, or before the error is raised for
// blocked ones. Events are never mutated once written.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The policy verdict as recorded in the log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVerdict {
    Allow,
    Deny,
}

/// What the interceptor actually did with the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    /// Policy allowed it; forwarded.
    Allowed,
    /// Policy denied it in warn mode; forwarded with a warning.
    Warned,
    /// Policy denied it in block mode; never dispatched.
    Blocked,
    /// Policy denied it in log mode; forwarded silently.
    Logged,
    /// The transport failed or the call was cancelled.
    Error,
}

/// A single intercept event — one line in the JSONL log.
///
/// Optional fields are omitted from the JSON when absent rather than
/// written as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptEvent {
    /// Unique identifier for this event.
    pub event_id: Uuid,

    /// When this event was recorded (UTC, RFC 3339).
    pub timestamp: DateTime<Utc>,

    pub method: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Network response code. Absent when blocked before dispatch or when
    /// the transport failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Milliseconds from interception to outcome, two decimal places.
    pub duration_ms: f64,

    pub policy_decision: PolicyVerdict,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_reasons: Option<Vec<String>>,

    pub enforcement_action: EnforcementAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InterceptEvent {
    /// Create an event with the current timestamp and a random UUID.
    ///
    /// Starts as an allowed request with zero duration — set the rest with
    /// the `with_*` builders.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            method: method.into(),
            url: url.into(),
            hostname: None,
            path: None,
            status: None,
            duration_ms: 0.0,
            policy_decision: PolicyVerdict::Allow,
            policy_reasons: None,
            enforcement_action: EnforcementAction::Allowed,
            error: None,
        }
    }

    /// Set hostname and path and return self.
    pub fn with_location(mut self, hostname: impl Into<String>, path: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self.path = Some(path.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Record elapsed time, rounded to two decimal places.
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.duration_ms = (ms * 100.0).round() / 100.0;
        self
    }

    pub fn with_decision(mut self, verdict: PolicyVerdict, action: EnforcementAction) -> Self {
        self.policy_decision = verdict;
        self.enforcement_action = action;
        self
    }

    /// Attach policy reasons. An empty list leaves the field absent.
    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.policy_reasons = if reasons.is_empty() {
            None
        } else {
            Some(reasons)
        };
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
