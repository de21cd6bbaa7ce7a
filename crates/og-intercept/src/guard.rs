// guard.rs — The shared evaluate-and-track routine.
//
// A Guard is the compiled, read-only state of one installed interceptor:
// policy, enforcement mode, exclusions and event log. Every transport
// adapter runs requests through the same two steps:
//
//   guard.admit(&request)  → Bypass | Tracked(Dispatch) | Err(PolicyViolation)
//   dispatch.succeeded(status) / dispatch.failed(err)
//
// A Dispatch that is dropped without either call (async cancellation, panic
// unwinding through the send) still writes its event, marked as an error.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use og_audit::{EnforcementAction, EventLog, InterceptEvent, PolicyVerdict};
use og_policy::{Decision, PolicyDecision, PolicySet, RequestContext};

use crate::config::InterceptorConfig;
use crate::enforcement::EnforcementMode;
use crate::error::{InterceptError, PolicyViolation};
use crate::exclusion::ExclusionSet;
use crate::transport::OutboundRequest;

/// Installed state of one interceptor, shared with every sender bound to it.
pub(crate) type Slot = Arc<RwLock<Option<Arc<Guard>>>>;

pub(crate) const CANCELLED_MESSAGE: &str = "request cancelled before completion";

#[derive(Debug, Default)]
struct Counters {
    intercepted: AtomicU64,
    bypassed: AtomicU64,
    violations: AtomicU64,
    blocked: AtomicU64,
}

/// Compiled interceptor state. Immutable once built.
#[derive(Debug)]
pub struct Guard {
    policy: Option<Arc<PolicySet>>,
    mode: EnforcementMode,
    exclusions: ExclusionSet,
    log: Option<EventLog>,
    debug: bool,
    counters: Counters,
}

/// Result of admitting a request.
#[derive(Debug)]
pub enum Admission {
    /// Forward untouched: excluded URL, or a URL that could not be parsed.
    Bypass,
    /// Forward and report the outcome through the handle.
    Tracked(Dispatch),
}

impl Guard {
    /// Compile a config into a guard.
    ///
    /// Only an unreadable policy file (or conflicting policy sources) fails.
    /// A log that cannot be opened is reported and logging is disabled.
    pub fn from_config(config: &InterceptorConfig) -> Result<Self, InterceptError> {
        let policy = config.compile_policy()?.map(Arc::new);

        let log = match &config.log_file {
            None => None,
            Some(path) => match EventLog::open(path) {
                Ok(log) => Some(log),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "could not open event log; request logging disabled"
                    );
                    None
                }
            },
        };

        Ok(Self {
            policy,
            mode: config.enforcement,
            exclusions: ExclusionSet::compile(&config.exclude_patterns),
            log,
            debug: config.debug,
            counters: Counters::default(),
        })
    }

    pub fn mode(&self) -> EnforcementMode {
        self.mode
    }

    pub fn policy(&self) -> Option<&PolicySet> {
        self.policy.as_deref()
    }

    pub fn rule_count(&self) -> usize {
        self.policy.as_ref().map_or(0, |p| p.len())
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|l| l.path())
    }

    pub fn events_logged(&self) -> u64 {
        self.log.as_ref().map_or(0, |l| l.events_written())
    }

    pub fn requests_intercepted(&self) -> u64 {
        self.counters.intercepted.load(Ordering::Relaxed)
    }

    pub fn requests_bypassed(&self) -> u64 {
        self.counters.bypassed.load(Ordering::Relaxed)
    }

    pub fn violations(&self) -> u64 {
        self.counters.violations.load(Ordering::Relaxed)
    }

    pub fn blocked(&self) -> u64 {
        self.counters.blocked.load(Ordering::Relaxed)
    }

    /// Evaluate a context against the compiled policy. No policy → Allow.
    pub fn evaluate(&self, ctx: &RequestContext) -> PolicyDecision {
        match &self.policy {
            Some(policy) => policy.evaluate(ctx),
            None => PolicyDecision::allow(),
        }
    }

    /// Run the pre-dispatch half of the pipeline for one request.
    ///
    /// Returns `Err` only for a Deny under block mode; the blocked event has
    /// already been written when it does.
    pub fn admit<R>(self: &Arc<Self>, request: &R) -> Result<Admission, PolicyViolation>
    where
        R: OutboundRequest + ?Sized,
    {
        let url = request.url();

        if self.exclusions.matches(url) {
            self.counters.bypassed.fetch_add(1, Ordering::Relaxed);
            if self.debug {
                tracing::debug!(url, "request excluded from interception");
            }
            return Ok(Admission::Bypass);
        }

        let mut ctx = match RequestContext::from_url(request.method(), url) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.counters.bypassed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(url, error = %e, "unparsable request URL; forwarding unchecked");
                return Ok(Admission::Bypass);
            }
        };
        for (name, value) in request.headers() {
            ctx = ctx.with_header(&name, value);
        }

        self.counters.intercepted.fetch_add(1, Ordering::Relaxed);
        let decision = self.evaluate(&ctx);
        let action = self.mode.action_for(decision.decision);

        if self.debug {
            tracing::debug!(
                method = %ctx.method,
                url = %ctx.url,
                decision = %decision.decision,
                action = ?action,
                "intercepted request"
            );
        }

        if decision.is_denied() {
            self.counters.violations.fetch_add(1, Ordering::Relaxed);
            if self.mode.blocks(decision.decision) {
                return Err(self.block(&ctx, decision));
            }
            let summary = decision.summary();
            if self.mode == EnforcementMode::Warn {
                tracing::warn!(
                    method = %ctx.method,
                    url = %ctx.url,
                    reasons = %summary,
                    "policy violation (warn mode; request allowed)"
                );
            } else {
                tracing::info!(
                    method = %ctx.method,
                    url = %ctx.url,
                    reasons = %summary,
                    "policy violation logged"
                );
            }
        }

        Ok(Admission::Tracked(Dispatch {
            guard: Arc::clone(self),
            ctx,
            decision,
            action,
            started: Instant::now(),
            finished: false,
        }))
    }

    fn block(&self, ctx: &RequestContext, decision: PolicyDecision) -> PolicyViolation {
        self.counters.blocked.fetch_add(1, Ordering::Relaxed);
        let violation = PolicyViolation {
            action: "http".to_string(),
            target: format!("{} {}", ctx.method, ctx.url),
            reasons: decision.reasons,
            matched_rules: decision.matched_rules,
        };

        tracing::error!(
            method = %ctx.method,
            url = %ctx.url,
            reasons = %violation.reasons.join("; "),
            "request blocked by policy"
        );

        self.record(
            base_event(ctx)
                .with_decision(PolicyVerdict::Deny, EnforcementAction::Blocked)
                .with_reasons(violation.reasons.clone())
                .with_error(violation.to_string()),
        );
        violation
    }

    fn record(&self, event: InterceptEvent) {
        if let Some(log) = &self.log {
            log.record(&event);
        }
    }
}

fn base_event(ctx: &RequestContext) -> InterceptEvent {
    InterceptEvent::new(&ctx.method, &ctx.url).with_location(&ctx.hostname, &ctx.path)
}

fn verdict(decision: Decision) -> PolicyVerdict {
    match decision {
        Decision::Allow => PolicyVerdict::Allow,
        Decision::Deny => PolicyVerdict::Deny,
    }
}

/// Handle for a request that was admitted and is being dispatched.
///
/// Consumed by [`succeeded`](Self::succeeded) or [`failed`](Self::failed).
/// Dropping it unconsumed records a cancellation.
#[derive(Debug)]
pub struct Dispatch {
    guard: Arc<Guard>,
    ctx: RequestContext,
    decision: PolicyDecision,
    action: EnforcementAction,
    started: Instant,
    finished: bool,
}

enum Outcome {
    Status(u16),
    Failed(String),
}

impl Dispatch {
    pub fn succeeded(mut self, status: u16) {
        self.finish(Outcome::Status(status));
    }

    pub fn failed(mut self, error: &dyn fmt::Display) {
        self.finish(Outcome::Failed(error.to_string()));
    }

    fn finish(&mut self, outcome: Outcome) {
        self.finished = true;
        let event = base_event(&self.ctx)
            .with_duration(self.started.elapsed())
            .with_reasons(self.decision.reasons.clone());
        let verdict = verdict(self.decision.decision);

        let event = match outcome {
            Outcome::Status(status) => event.with_status(status).with_decision(verdict, self.action),
            Outcome::Failed(message) => {
                if self.guard.debug {
                    tracing::debug!(url = %self.ctx.url, error = %message, "request failed");
                }
                event
                    .with_decision(verdict, EnforcementAction::Error)
                    .with_error(message)
            }
        };
        self.guard.record(event);
    }
}

impl Drop for Dispatch {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Outcome::Failed(CANCELLED_MESSAGE.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Req(&'static str, &'static str);

    impl OutboundRequest for Req {
        fn method(&self) -> &str {
            self.0
        }
        fn url(&self) -> &str {
            self.1
        }
    }

    const POLICY: &str = r#"
forbid(principal, action == Action::"http", resource) when { resource.hostname == "blocked.com" };
"#;

    fn guard(mode: EnforcementMode, log: &Path) -> Arc<Guard> {
        let config = InterceptorConfig::default()
            .with_policy_text(POLICY)
            .with_enforcement(mode)
            .with_log_file(log)
            .with_exclude_patterns(["internal\\.local"]);
        Arc::new(Guard::from_config(&config).unwrap())
    }

    #[test]
    fn block_mode_rejects_and_logs_before_returning() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("events.jsonl");
        let g = guard(EnforcementMode::Block, &log);

        let err = g.admit(&Req("GET", "https://blocked.com/x")).unwrap_err();
        assert_eq!(err.target, "GET https://blocked.com/x");
        assert_eq!(err.reasons.len(), 1);
        assert_eq!(g.blocked(), 1);

        let events = EventLog::read_all(&log).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].enforcement_action, EnforcementAction::Blocked);
        assert_eq!(events[0].status, None);
        assert_eq!(events[0].error.as_deref(), Some(err.to_string().as_str()));
    }

    #[test]
    fn succeeded_writes_one_combined_event() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("events.jsonl");
        let g = guard(EnforcementMode::Warn, &log);

        match g.admit(&Req("GET", "https://blocked.com/x")).unwrap() {
            Admission::Tracked(d) => d.succeeded(200),
            Admission::Bypass => panic!("should be tracked"),
        }

        let events = EventLog::read_all(&log).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].enforcement_action, EnforcementAction::Warned);
        assert_eq!(events[0].policy_decision, PolicyVerdict::Deny);
        assert_eq!(events[0].status, Some(200));
        assert_eq!(g.violations(), 1);
    }

    #[test]
    fn dropped_dispatch_is_recorded_as_cancelled() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("events.jsonl");
        let g = guard(EnforcementMode::Log, &log);

        let admission = g.admit(&Req("GET", "https://ok.com/")).unwrap();
        drop(admission);

        let events = EventLog::read_all(&log).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].enforcement_action, EnforcementAction::Error);
        assert_eq!(events[0].error.as_deref(), Some(CANCELLED_MESSAGE));
    }

    #[test]
    fn excluded_and_unparsable_urls_bypass() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("events.jsonl");
        let g = guard(EnforcementMode::Block, &log);

        assert!(matches!(
            g.admit(&Req("GET", "https://internal.local/blocked.com")).unwrap(),
            Admission::Bypass
        ));
        assert!(matches!(
            g.admit(&Req("GET", "not a url")).unwrap(),
            Admission::Bypass
        ));
        assert_eq!(g.requests_bypassed(), 2);
        assert_eq!(g.requests_intercepted(), 0);
        assert!(EventLog::read_all(&log).unwrap().is_empty());
    }

    #[test]
    fn unwritable_log_disables_logging_but_not_requests() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as the log file.
        let g = guard(EnforcementMode::Log, dir.path());
        assert!(g.log_path().is_none());

        match g.admit(&Req("GET", "https://ok.com/")).unwrap() {
            Admission::Tracked(d) => d.succeeded(204),
            Admission::Bypass => panic!("should be tracked"),
        }
        assert_eq!(g.events_logged(), 0);
    }

    #[test]
    fn no_policy_allows_everything() {
        let g = Guard::from_config(&InterceptorConfig::default()).unwrap();
        let ctx = RequestContext::from_url("DELETE", "https://anything.com/").unwrap();
        let decision = g.evaluate(&ctx);
        assert!(decision.is_allowed());
        assert!(decision.reasons.is_empty());
        assert_eq!(g.rule_count(), 0);
    }
}
