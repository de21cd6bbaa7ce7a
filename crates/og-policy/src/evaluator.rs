// evaluator.rs — Policy evaluation.
//
// Every rule is tested independently against the request context. Matching
// rules are partitioned by effect, then:
//
// 1. Any forbid matched? → Deny, one reason per matching forbid rule
// 2. Any permit matched? → Allow, one reason per matching permit rule
// 3. Nothing matched     → Allow (Standard) or Deny (Strict)
//
// Evaluation never fails. A missing field, a non-numeric value under a
// numeric comparison, or an unknown field just means the rule does not match.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::PolicyError;
use crate::parser::parse_policy;
use crate::rule::{Effect, Operator, PolicyRule, Value};

/// Summary used when a request matched no rule in Standard mode.
pub const DEFAULT_ALLOW_REASON: &str = "No matching policy rules";

/// Reason used when a request matched no permit rule in Strict mode.
pub const DEFAULT_DENY_REASON: &str = "No permit rule matched (default deny)";

/// Final verdict of an evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("Allow"),
            Decision::Deny => f.write_str("Deny"),
        }
    }
}

/// How to treat requests that no rule matched.
///
/// `Standard` treats permit rules as advisory: only forbid rules can deny.
/// `Strict` denies by default and lets explicit permit rules open access.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    #[default]
    Standard,
    Strict,
}

/// Evaluator output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDecision {
    pub decision: Decision,
    /// One formatted string per rule that drove the decision, in source order.
    pub reasons: Vec<String>,
    /// Raw source of each contributing rule, parallel to `reasons`.
    pub matched_rules: Vec<String>,
}

impl PolicyDecision {
    /// Allow with no reasons — used when no policy is configured at all.
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            reasons: Vec::new(),
            matched_rules: Vec::new(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }

    pub fn is_denied(&self) -> bool {
        self.decision == Decision::Deny
    }

    /// Reasons joined with `"; "`, or the default-allow summary when empty.
    pub fn summary(&self) -> String {
        if self.reasons.is_empty() {
            DEFAULT_ALLOW_REASON.to_string()
        } else {
            self.reasons.join("; ")
        }
    }
}

/// A compiled, read-only rule list plus the mode it is evaluated under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySet {
    rules: Vec<PolicyRule>,
    mode: EvaluationMode,
}

impl PolicySet {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules,
            mode: EvaluationMode::Standard,
        }
    }

    /// Parse policy text. Never fails; malformed blocks are skipped.
    pub fn from_text(policy_text: &str) -> Self {
        Self::new(parse_policy(policy_text))
    }

    /// Read and parse a policy file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_text(&text))
    }

    /// Set the evaluation mode and return self.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate(&self, ctx: &RequestContext) -> PolicyDecision {
        evaluate_with_mode(ctx, &self.rules, self.mode)
    }
}

/// Evaluate under [`EvaluationMode::Standard`] (default allow).
pub fn evaluate(ctx: &RequestContext, rules: &[PolicyRule]) -> PolicyDecision {
    evaluate_with_mode(ctx, rules, EvaluationMode::Standard)
}

/// Evaluate a request context against rules.
pub fn evaluate_with_mode(
    ctx: &RequestContext,
    rules: &[PolicyRule],
    mode: EvaluationMode,
) -> PolicyDecision {
    let mut forbid = PolicyDecision {
        decision: Decision::Deny,
        reasons: Vec::new(),
        matched_rules: Vec::new(),
    };
    let mut permit = PolicyDecision::allow();

    for rule in rules {
        let Some(actual) = matching_value(rule, ctx) else {
            continue;
        };
        let reason = format!("{}: {} (actual: {})", rule.effect, rule.condition(), actual);
        let bucket = match rule.effect {
            Effect::Forbid => &mut forbid,
            Effect::Permit => &mut permit,
        };
        bucket.reasons.push(reason);
        bucket.matched_rules.push(rule.raw.clone());
    }

    if !forbid.reasons.is_empty() {
        return forbid;
    }
    if !permit.reasons.is_empty() {
        return permit;
    }

    match mode {
        EvaluationMode::Standard => PolicyDecision::allow(),
        EvaluationMode::Strict => PolicyDecision {
            decision: Decision::Deny,
            reasons: vec![DEFAULT_DENY_REASON.to_string()],
            matched_rules: Vec::new(),
        },
    }
}

/// Return the actual field value if the rule matches the context.
fn matching_value<'a>(rule: &PolicyRule, ctx: &'a RequestContext) -> Option<&'a str> {
    if !rule.action.matches(&ctx.method) {
        return None;
    }
    let actual = ctx.field(&rule.field).filter(|v| !v.is_empty())?;
    condition_holds(rule.operator, &rule.value, actual).then_some(actual)
}

fn condition_holds(op: Operator, expected: &Value, actual: &str) -> bool {
    match expected {
        Value::Str(s) => compare_str(op, actual, s),
        Value::Int(_) | Value::Float(_) if op.is_numeric() => {
            let (Ok(actual), Some(target)) = (actual.trim().parse::<f64>(), expected.as_f64())
            else {
                return false;
            };
            compare_num(op, actual, target)
        }
        // contains / startsWith / endsWith against a numeric literal compare text.
        numeric => compare_str(op, actual, &numeric.to_string()),
    }
}

/// Case-insensitive string comparison. Ordering operators are lexicographic.
fn compare_str(op: Operator, actual: &str, expected: &str) -> bool {
    let actual = actual.to_lowercase();
    let expected = expected.to_lowercase();
    match op {
        Operator::Eq => actual == expected,
        Operator::NotEq => actual != expected,
        Operator::Contains => actual.contains(&expected),
        Operator::StartsWith => actual.starts_with(&expected),
        Operator::EndsWith => actual.ends_with(&expected),
        Operator::Gt => actual > expected,
        Operator::Gte => actual >= expected,
        Operator::Lt => actual < expected,
        Operator::Lte => actual <= expected,
    }
}

fn compare_num(op: Operator, actual: f64, target: f64) -> bool {
    match op {
        Operator::Eq => actual == target,
        Operator::NotEq => actual != target,
        Operator::Gt => actual > target,
        Operator::Gte => actual >= target,
        Operator::Lt => actual < target,
        Operator::Lte => actual <= target,
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ActionPattern;

    fn rule(effect: Effect, field: &str, op: Operator, value: Value) -> PolicyRule {
        PolicyRule {
            effect,
            action: ActionPattern::any(),
            field: field.to_string(),
            operator: op,
            value,
            raw: format!("{} {} {:?}", effect, field, op),
        }
    }

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    fn ctx(method: &str, url: &str) -> RequestContext {
        RequestContext::from_url(method, url).unwrap()
    }

    #[test]
    fn forbid_match_denies_with_formatted_reason() {
        let rules = vec![rule(Effect::Forbid, "hostname", Operator::Eq, s("malicious.com"))];
        let d = evaluate(&ctx("GET", "https://malicious.com/x"), &rules);
        assert_eq!(d.decision, Decision::Deny);
        assert_eq!(d.reasons.len(), 1);
        assert_eq!(
            d.reasons[0],
            "forbid: resource.hostname == malicious.com (actual: malicious.com)"
        );
        assert_eq!(d.matched_rules.len(), 1);
    }

    #[test]
    fn no_match_allows_with_no_reasons() {
        let rules = vec![rule(Effect::Forbid, "hostname", Operator::Eq, s("malicious.com"))];
        let d = evaluate(&ctx("GET", "https://safe.com/"), &rules);
        assert!(d.is_allowed());
        assert!(d.reasons.is_empty());
        assert_eq!(d.summary(), DEFAULT_ALLOW_REASON);
    }

    #[test]
    fn string_comparisons_ignore_case() {
        let c = RequestContext::new("GET", "https://BLOCKED.COM/", "BLOCKED.COM", "/Upload/File");
        for (field, op, value) in [
            ("hostname", Operator::Eq, "blocked.com"),
            ("hostname", Operator::Contains, "locked"),
            ("hostname", Operator::StartsWith, "blocked"),
            ("hostname", Operator::EndsWith, ".com"),
            ("path", Operator::Contains, "/upload/"),
        ] {
            let rules = vec![rule(Effect::Forbid, field, op, s(value))];
            assert!(evaluate(&c, &rules).is_denied(), "{} {} {}", field, op, value);
        }
        let rules = vec![rule(Effect::Forbid, "hostname", Operator::NotEq, s("blocked.com"))];
        assert!(evaluate(&c, &rules).is_allowed());
    }

    #[test]
    fn forbid_beats_permit() {
        let rules = vec![
            rule(Effect::Permit, "method", Operator::Eq, s("GET")),
            rule(Effect::Forbid, "hostname", Operator::Eq, s("a.com")),
        ];
        let d = evaluate(&ctx("GET", "https://a.com/"), &rules);
        assert!(d.is_denied());
        assert_eq!(d.reasons.len(), 1);
        assert!(d.reasons[0].starts_with("forbid:"));
    }

    #[test]
    fn permit_reasons_reported_when_no_forbid() {
        let rules = vec![
            rule(Effect::Permit, "method", Operator::Eq, s("GET")),
            rule(Effect::Permit, "hostname", Operator::EndsWith, s(".com")),
        ];
        let d = evaluate(&ctx("GET", "https://a.com/"), &rules);
        assert!(d.is_allowed());
        assert_eq!(d.reasons.len(), 2);
        assert!(d.reasons[0].contains("resource.method == GET"));
        assert!(d.reasons[1].contains("resource.hostname endsWith .com"));
    }

    #[test]
    fn numeric_comparisons_use_parsed_values() {
        let rules = vec![rule(Effect::Forbid, "port", Operator::Gt, Value::Int(8080))];
        assert!(evaluate(&ctx("GET", "http://a.com:9000/"), &rules).is_denied());
        assert!(evaluate(&ctx("GET", "http://a.com:8080/"), &rules).is_allowed());

        let rules = vec![rule(Effect::Forbid, "port", Operator::Lte, Value::Float(443.0))];
        assert!(evaluate(&ctx("GET", "https://a.com/"), &rules).is_denied());
    }

    #[test]
    fn float_rule_reason_shows_literal_as_written() {
        let rules = vec![rule(Effect::Forbid, "port", Operator::Gte, Value::Float(443.0))];
        let d = evaluate(&ctx("GET", "https://a.com/"), &rules);
        assert_eq!(d.reasons, vec!["forbid: resource.port >= 443.0 (actual: 443)".to_string()]);
    }

    #[test]
    fn non_numeric_actual_never_matches_numeric_rule() {
        let rules = vec![
            rule(Effect::Forbid, "hostname", Operator::Gt, Value::Int(10)),
            rule(Effect::Forbid, "hostname", Operator::NotEq, Value::Int(10)),
        ];
        let d = evaluate(&ctx("GET", "https://a.com/"), &rules);
        assert!(d.is_allowed());
    }

    #[test]
    fn unknown_field_never_matches() {
        let rules = vec![rule(Effect::Forbid, "body", Operator::NotEq, s("x"))];
        assert!(evaluate(&ctx("GET", "https://a.com/"), &rules).is_allowed());
    }

    #[test]
    fn action_selector_limits_rule_to_method() {
        let mut r = rule(Effect::Forbid, "hostname", Operator::Eq, s("a.com"));
        r.action = ActionPattern::new("POST");
        let rules = vec![r];
        assert!(evaluate(&ctx("GET", "https://a.com/"), &rules).is_allowed());
        assert!(evaluate(&ctx("POST", "https://a.com/"), &rules).is_denied());
    }

    #[test]
    fn strict_mode_denies_unmatched_and_honors_permit() {
        let rules = vec![
            rule(Effect::Permit, "hostname", Operator::Eq, s("api.openai.com")),
            rule(Effect::Forbid, "path", Operator::Contains, s("/admin")),
        ];
        let denied = evaluate_with_mode(&ctx("GET", "https://other.com/"), &rules, EvaluationMode::Strict);
        assert!(denied.is_denied());
        assert_eq!(denied.reasons, vec![DEFAULT_DENY_REASON.to_string()]);

        let allowed = evaluate_with_mode(
            &ctx("GET", "https://api.openai.com/v1"),
            &rules,
            EvaluationMode::Strict,
        );
        assert!(allowed.is_allowed());

        let forbidden = evaluate_with_mode(
            &ctx("GET", "https://api.openai.com/admin"),
            &rules,
            EvaluationMode::Strict,
        );
        assert!(forbidden.is_denied());
        assert!(forbidden.reasons[0].starts_with("forbid:"));
    }

    #[test]
    fn policy_set_from_text_uses_its_mode() {
        let set = PolicySet::from_text(
            r#"permit ( principal, action == Action::"GET", resource ) when { resource.hostname == "ok.com" };"#,
        )
        .with_mode(EvaluationMode::Strict);
        assert_eq!(set.len(), 1);
        assert!(set.evaluate(&ctx("GET", "https://ok.com/")).is_allowed());
        assert!(set.evaluate(&ctx("POST", "https://ok.com/")).is_denied());
    }

    #[test]
    fn missing_policy_file_is_read_error() {
        let err = PolicySet::from_file("/definitely/not/here.cedar").unwrap_err();
        assert!(matches!(err, PolicyError::ReadFailed { .. }));
        assert!(err.to_string().contains("/definitely/not/here.cedar"));
    }

    #[test]
    fn decision_serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&Decision::Deny).unwrap(), "\"deny\"");
    }
}
