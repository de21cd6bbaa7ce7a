//! # og-audit
//!
//! Append-only intercept event log for Outbound Guard.
//!
//! Every intercepted outbound request is recorded as an [`InterceptEvent`]
//! in a JSONL (JSON Lines) file: one complete JSON object per line, written
//! under a lock so concurrent callers never interleave bytes.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use og_audit::{EnforcementAction, EventLog, InterceptEvent, PolicyVerdict};
//!
//! let log = EventLog::open("/tmp/og/events.jsonl").unwrap();
//! let event = InterceptEvent::new("GET", "https://example.com/")
//!     .with_status(200)
//!     .with_decision(PolicyVerdict::Allow, EnforcementAction::Allowed);
//! log.append(&event).unwrap();
//! ```

pub mod error;
pub mod event;
pub mod log;

pub use error::AuditError;
pub use event::{EnforcementAction, InterceptEvent, PolicyVerdict};
pub use log::EventLog;
