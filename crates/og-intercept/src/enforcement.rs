// enforcement.rs — What to do with a Deny decision.
//
//   | Decision | block   | warn   | log    |
//   |----------|---------|--------|--------|
//   | Deny     | blocked | warned | logged |
//   | Allow    | allowed | allowed| allowed|

use std::fmt;
use std::str::FromStr;

use og_audit::EnforcementAction;
use og_policy::Decision;
use serde::{Deserialize, Serialize};

use crate::error::InterceptError;

/// Configured response to a Deny decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnforcementMode {
    /// Abort the request with a policy violation error.
    Block,
    /// Forward the request and emit a warning.
    Warn,
    /// Forward the request silently; the event log is the only trace.
    #[default]
    Log,
}

impl EnforcementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementMode::Block => "block",
            EnforcementMode::Warn => "warn",
            EnforcementMode::Log => "log",
        }
    }

    /// Whether a request with this decision must not be dispatched.
    pub fn blocks(&self, decision: Decision) -> bool {
        decision == Decision::Deny && *self == EnforcementMode::Block
    }

    /// The action recorded in the event log for this decision.
    pub fn action_for(&self, decision: Decision) -> EnforcementAction {
        match (decision, self) {
            (Decision::Allow, _) => EnforcementAction::Allowed,
            (Decision::Deny, EnforcementMode::Block) => EnforcementAction::Blocked,
            (Decision::Deny, EnforcementMode::Warn) => EnforcementAction::Warned,
            (Decision::Deny, EnforcementMode::Log) => EnforcementAction::Logged,
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementMode {
    type Err = InterceptError;

    /// Case-insensitive: `"BLOCK"`, `"Block"` and `"block"` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(EnforcementMode::Block),
            "warn" => Ok(EnforcementMode::Warn),
            "log" => Ok(EnforcementMode::Log),
            _ => Err(InterceptError::InvalidEnforcement(s.to_string())),
        }
    }
}

impl TryFrom<String> for EnforcementMode {
    type Error = InterceptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnforcementMode> for String {
    fn from(mode: EnforcementMode) -> Self {
        mode.as_str().to_string()
    }
}
