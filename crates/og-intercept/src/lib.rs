//! # og-intercept
//!
//! Policy-enforcing wrapper around an HTTP transport.
//!
//! The host application hands its sender (any [`Transport`] or
//! [`AsyncTransport`]) to an [`Interceptor`] and gets back an
//! [`Intercepted`] sender with the same call shape. While the interceptor is
//! installed, every request through that sender is:
//!
//! 1. checked against the exclusion patterns (excluded → forwarded untouched),
//! 2. evaluated against the compiled policy,
//! 3. blocked, warned about, or logged according to the [`EnforcementMode`],
//! 4. dispatched (unless blocked) and timed,
//! 5. recorded as one JSON line in the event log.
//!
//! ```rust,no_run
//! use og_intercept::{EnforcementMode, Interceptor, InterceptorConfig, Transport};
//!
//! let config = InterceptorConfig::default()
//!     .with_policy_file(".og/agent.cedar")
//!     .with_enforcement(EnforcementMode::Block)
//!     .with_log_file(".og/events.jsonl");
//! let interceptor = Interceptor::new(config);
//! interceptor.install()?;
//!
//! let client = interceptor.wrap(reqwest::blocking::Client::new());
//! let request = reqwest::blocking::Request::new(
//!     reqwest::Method::GET,
//!     "https://api.example.com/v1".parse().unwrap(),
//! );
//! match client.send(request) {
//!     Ok(response) => println!("status {}", response.status()),
//!     Err(e) if e.is_blocked() => eprintln!("{}", e),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Key invariants
//!
//! - **At most one installed interceptor** per process ([`global`]).
//! - **Blocked requests never reach the network.**
//! - **Fail-open**: unparsable URLs, unwritable logs and other internal
//!   faults never break the caller's request. Only block-mode violations
//!   and an unreadable, explicitly requested policy file surface as errors.

pub mod adapters;
pub mod config;
pub mod enforcement;
pub mod error;
pub mod exclusion;
pub mod global;
pub mod guard;
pub mod interceptor;
pub mod transport;

pub use config::{InterceptorConfig, PolicySource};
pub use enforcement::EnforcementMode;
pub use error::{InterceptError, PolicyViolation, SendError};
pub use exclusion::ExclusionSet;
pub use guard::{Admission, Dispatch, Guard};
pub use interceptor::{InstallGuard, Interceptor, InterceptorStats};
pub use transport::{AsyncTransport, InboundResponse, Intercepted, OutboundRequest, Transport};
