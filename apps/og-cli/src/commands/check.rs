// check.rs — Evaluate one request against a policy file.

use std::path::Path;

use anyhow::Context;
use og_policy::{EvaluationMode, PolicyDecision, PolicySet, RequestContext};

pub fn execute(
    policy: &Path,
    method: &str,
    strict: bool,
    headers: &[String],
    url: &str,
) -> anyhow::Result<bool> {
    let decision = check_request(policy, method, strict, headers, url)?;

    println!("{} {} → {}", method.to_ascii_uppercase(), url, decision.decision);
    if decision.reasons.is_empty() {
        println!("  {}", decision.summary());
    }
    for reason in &decision.reasons {
        println!("  {}", reason);
    }

    Ok(decision.is_allowed())
}

pub fn check_request(
    policy: &Path,
    method: &str,
    strict: bool,
    headers: &[String],
    url: &str,
) -> anyhow::Result<PolicyDecision> {
    let mode = if strict {
        EvaluationMode::Strict
    } else {
        EvaluationMode::Standard
    };
    let set = PolicySet::from_file(policy)?.with_mode(mode);

    let mut ctx = RequestContext::from_url(method, url)?;
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header '{}' must be NAME:VALUE", header))?;
        ctx = ctx.with_header(name.trim(), value.trim());
    }

    Ok(set.evaluate(&ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use og_policy::Decision;
    use tempfile::tempdir;

    const POLICY: &str = r#"
forbid(principal, action == Action::"http", resource) when { resource.hostname == "malicious.com" };
forbid(principal, action == Action::"http", resource) when { resource.header_authorization contains "admin" };
permit(principal, action == Action::"GET", resource) when { resource.hostname endsWith ".example.com" };
"#;

    fn policy_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("agent.cedar");
        std::fs::write(&path, POLICY).unwrap();
        path
    }

    #[test]
    fn denies_forbidden_host() {
        let dir = tempdir().unwrap();
        let path = policy_file(dir.path());
        let d = check_request(&path, "get", false, &[], "https://malicious.com/x").unwrap();
        assert_eq!(d.decision, Decision::Deny);
        assert_eq!(d.reasons.len(), 1);
    }

    #[test]
    fn headers_reach_the_evaluator() {
        let dir = tempdir().unwrap();
        let path = policy_file(dir.path());
        let headers = vec!["Authorization: Bearer admin-token".to_string()];
        let d = check_request(&path, "GET", false, &headers, "https://api.example.com/").unwrap();
        assert_eq!(d.decision, Decision::Deny);
    }

    #[test]
    fn strict_mode_requires_a_permit() {
        let dir = tempdir().unwrap();
        let path = policy_file(dir.path());
        let permitted = check_request(&path, "GET", true, &[], "https://api.example.com/").unwrap();
        assert!(permitted.is_allowed());
        let other = check_request(&path, "GET", true, &[], "https://other.org/").unwrap();
        assert!(other.is_denied());
        let lenient = check_request(&path, "GET", false, &[], "https://other.org/").unwrap();
        assert!(lenient.is_allowed());
    }

    #[test]
    fn malformed_header_is_an_error() {
        let dir = tempdir().unwrap();
        let path = policy_file(dir.path());
        let headers = vec!["no-colon".to_string()];
        assert!(check_request(&path, "GET", false, &headers, "https://a.com/").is_err());
    }

    #[test]
    fn missing_policy_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = check_request(&dir.path().join("nope.cedar"), "GET", false, &[], "https://a.com/");
        assert!(result.is_err());
    }
}
