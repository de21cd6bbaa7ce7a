//! # og-policy
//!
//! Cedar-like policy language for Outbound Guard.
//!
//! A policy is plain text made of `forbid` / `permit` blocks. The [`parser`]
//! turns that text into an ordered list of [`PolicyRule`]s and the
//! [`evaluator`] judges a [`RequestContext`] against them, producing a
//! [`PolicyDecision`].
//!
//! ```rust
//! use og_policy::{PolicySet, RequestContext};
//!
//! let set = PolicySet::from_text(r#"
//!     forbid ( principal, action == Action::"*", resource )
//!     when { resource.hostname == "malicious.com" };
//! "#);
//! let ctx = RequestContext::from_url("GET", "https://malicious.com/x").unwrap();
//! assert!(set.evaluate(&ctx).is_denied());
//! ```
//!
//! ## Key invariants
//!
//! - **Forbid wins**: any matching forbid rule denies, whatever else matches.
//! - **Default allow**: with no matching rule the request is allowed, unless
//!   the set runs in [`EvaluationMode::Strict`].
//! - **Never fails**: missing fields, non-numeric values and unknown
//!   operators degrade to "rule does not match".

pub mod context;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod rule;

pub use context::RequestContext;
pub use error::PolicyError;
pub use evaluator::{
    evaluate, evaluate_with_mode, Decision, EvaluationMode, PolicyDecision, PolicySet,
};
pub use parser::parse_policy;
pub use rule::{ActionPattern, Effect, Operator, PolicyRule, Value};
