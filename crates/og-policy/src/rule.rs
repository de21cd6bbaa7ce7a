// rule.rs — Parsed policy rule and its building blocks.
//
// A PolicyRule is one (effect, action, field, operator, value) tuple. A
// `when { ... }` block with three conditions produces three rules, each
// evaluated on its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP methods recognized as concrete action selectors.
const HTTP_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "CONNECT", "TRACE",
];

/// Whether a matching rule denies or permits the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Forbid,
    Permit,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Forbid => "forbid",
            Effect::Permit => "permit",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forbid" => Ok(Effect::Forbid),
            "permit" => Ok(Effect::Permit),
            other => Err(format!("unknown effect '{}'", other)),
        }
    }
}

/// The verb selector from `action == Action::"<selector>"`.
///
/// - `*` matches every method.
/// - `P*` is a case-insensitive prefix match (POST, PUT, PATCH).
/// - A selector naming an HTTP method must equal the request method.
/// - Anything else (`http`, `deploy`, ...) is the generic outbound-request
///   action and applies to every method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ActionPattern(String);

impl ActionPattern {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    /// Pattern that matches every method.
    pub fn any() -> Self {
        Self("*".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this selector applies to the given HTTP method.
    pub fn matches(&self, method: &str) -> bool {
        let selector = self.0.trim();
        if selector.is_empty() || selector == "*" {
            return true;
        }
        if let Some(prefix) = selector.strip_suffix('*') {
            return method
                .to_ascii_uppercase()
                .starts_with(&prefix.to_ascii_uppercase());
        }
        let upper = selector.to_ascii_uppercase();
        if HTTP_METHODS.contains(&upper.as_str()) {
            upper == method.to_ascii_uppercase()
        } else {
            true
        }
    }
}

impl fmt::Display for ActionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comparison operator in a condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }

    /// Operators that have a numeric interpretation.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::Gt
                | Operator::Gte
                | Operator::Lt
                | Operator::Lte
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    /// Word operators are case-insensitive (`startsWith` and `startswith`
    /// are the same operator).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::NotEq),
            "contains" => Ok(Operator::Contains),
            "startswith" => Ok(Operator::StartsWith),
            "endswith" => Ok(Operator::EndsWith),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            other => Err(format!("unknown operator '{}'", other)),
        }
    }
}

/// A typed literal from the policy source.
///
/// `#[serde(untagged)]` writes the bare value (`"x"`, `8080`, `75.5`) instead
/// of `{"Str": "x"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Infer the type of an unquoted literal: integer, then float, else string.
    ///
    /// Float parsing only applies to lexemes containing a digit so words like
    /// `inf` or `NaN` stay strings.
    pub fn infer(lexeme: &str) -> Self {
        if let Ok(i) = lexeme.parse::<i64>() {
            return Value::Int(i);
        }
        if lexeme.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(f) = lexeme.parse::<f64>() {
                return Value::Float(f);
            }
        }
        Value::Str(lexeme.to_string())
    }

    /// Numeric view of the literal, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            // `{:?}` keeps the fractional part: 443.0 stays "443.0".
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// One parsed condition clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyRule {
    pub effect: Effect,
    pub action: ActionPattern,
    /// Request attribute under test (`url`, `method`, `hostname`, `path`, ...).
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    /// Source text of the rule block this condition came from.
    pub raw: String,
}

impl PolicyRule {
    /// Human-readable condition, e.g. `resource.hostname == malicious.com`.
    pub fn condition(&self) -> String {
        format!("resource.{} {} {}", self.field, self.operator, self.value)
    }
}
