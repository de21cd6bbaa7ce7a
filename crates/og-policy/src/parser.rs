// parser.rs — Policy text → ordered list of PolicyRules.
//
// Grammar (keywords case-insensitive, `//` comments anywhere):
//
//   (forbid|permit) ( principal , action == Action::"<selector>" , resource )
//   when { resource.<field> <op> <value> (; resource.<field> <op> <value>)* } ;
//
// Every condition inside a `when` block becomes its own rule. The conditions
// are OR'd, not AND'd: a block with two conditions fires when either holds.
// Malformed blocks are skipped, never fatal.

use std::sync::OnceLock;

use regex::Regex;

use crate::rule::{ActionPattern, Effect, Operator, PolicyRule, Value};

fn rule_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)\b(forbid|permit)\s*\(\s*principal\s*,\s*action\s*==\s*Action::"([^"]*)"\s*,\s*resource\s*\)\s*when\s*\{((?:"[^"]*"|[^}"])*)\}\s*;"#,
        )
        .expect("rule block pattern is valid")
    })
}

fn condition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\b(?:resource|request)\.(\w+)\s*(==|!=|>=|<=|>|<|contains\b|startswith\b|endswith\b)\s*(?:"([^"]*)"|([^\s;"}&|]+))"#,
        )
        .expect("condition pattern is valid")
    })
}

fn block_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(forbid|permit)\s*\(").expect("block start pattern is valid"))
}

/// Parse policy source text into rules, preserving source order.
///
/// Empty or comment-only text yields an empty list. Identical input always
/// yields an identical list.
pub fn parse_policy(policy_text: &str) -> Vec<PolicyRule> {
    let cleaned = strip_comments(policy_text);
    let mut rules = Vec::new();
    let mut blocks_seen = 0usize;

    for block in rule_block_re().captures_iter(&cleaned) {
        blocks_seen += 1;

        let raw = block[0].trim().to_string();
        let effect = match block[1].parse::<Effect>() {
            Ok(effect) => effect,
            Err(_) => continue,
        };
        let action = ActionPattern::new(block[2].trim());
        let body = &block[3];

        let before = rules.len();
        for cond in condition_re().captures_iter(body) {
            let field = cond[1].to_ascii_lowercase();
            let operator = match cond[2].parse::<Operator>() {
                Ok(op) => op,
                Err(reason) => {
                    tracing::debug!(%reason, "skipping condition");
                    continue;
                }
            };
            let value = match (cond.get(3), cond.get(4)) {
                (Some(quoted), _) => Value::Str(quoted.as_str().to_string()),
                (None, Some(bare)) => Value::infer(bare.as_str().trim()),
                (None, None) => continue,
            };

            rules.push(PolicyRule {
                effect,
                action: action.clone(),
                field,
                operator,
                value,
                raw: raw.clone(),
            });
        }

        if rules.len() == before {
            tracing::debug!(block = %raw, "rule block has no recognizable conditions; skipped");
        }
    }

    let starts = block_start_re().find_iter(&cleaned).count();
    if starts > blocks_seen {
        tracing::debug!(
            skipped = starts - blocks_seen,
            "malformed policy blocks skipped"
        );
    }

    rules
}

/// Remove `//` line comments that are not inside a double-quoted literal.
///
/// URLs such as `"https://example.com"` must survive, so this walks the text
/// instead of using a blanket regex.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                out.push(c);
            }
            '\n' => {
                // Literals never span lines; an unterminated quote ends here.
                in_quotes = false;
                out.push(c);
            }
            '/' if !in_quotes && chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}
