// config.rs — Interceptor configuration.
//
// Loaded from TOML (`og.toml`) or built in code with the `with_*` methods.
// Every key is optional:
//
// ```toml
// policy_file = ".og/agent.cedar"   # or: policy = "forbid(...) when {...};"
// enforcement = "block"             # block | warn | log (default: log)
// log_file = ".og/events.jsonl"
// exclude_patterns = ["^https://telemetry\\."]
// debug = false
// strict = false                    # default-deny evaluation
// ```

use std::path::{Path, PathBuf};

use og_policy::{EvaluationMode, PolicySet};
use serde::{Deserialize, Serialize};

use crate::enforcement::EnforcementMode;
use crate::error::InterceptError;

/// Where the policy text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    File(PathBuf),
    Inline(String),
}

/// Settings for one [`Interceptor`](crate::Interceptor).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterceptorConfig {
    /// Path to a policy file. Mutually exclusive with `policy`.
    pub policy_file: Option<PathBuf>,
    /// Inline policy text. Mutually exclusive with `policy_file`.
    pub policy: Option<String>,
    pub enforcement: EnforcementMode,
    /// JSONL event log. No logging when unset.
    pub log_file: Option<PathBuf>,
    /// Regexes matched against the full URL; matches bypass the interceptor.
    pub exclude_patterns: Vec<String>,
    /// Emit a `debug!` trace for every intercepted request.
    pub debug: bool,
    /// Deny requests that no permit rule matches.
    pub strict: bool,
}

impl InterceptorConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, InterceptError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| InterceptError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self = toml::from_str(&content)?;
        config.policy_source()?;
        Ok(config)
    }

    /// Load config from a TOML file, falling back to defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, InterceptError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn with_policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_file = Some(path.into());
        self
    }

    pub fn with_policy_text(mut self, text: impl Into<String>) -> Self {
        self.policy = Some(text.into());
        self
    }

    pub fn with_enforcement(mut self, mode: EnforcementMode) -> Self {
        self.enforcement = mode;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The configured policy source, if any.
    pub fn policy_source(&self) -> Result<Option<PolicySource>, InterceptError> {
        match (&self.policy_file, &self.policy) {
            (Some(_), Some(_)) => Err(InterceptError::ConflictingPolicySource),
            (Some(path), None) => Ok(Some(PolicySource::File(path.clone()))),
            (None, Some(text)) => Ok(Some(PolicySource::Inline(text.clone()))),
            (None, None) => Ok(None),
        }
    }

    pub fn evaluation_mode(&self) -> EvaluationMode {
        if self.strict {
            EvaluationMode::Strict
        } else {
            EvaluationMode::Standard
        }
    }

    /// Compile the configured policy. `None` when no source is configured.
    pub fn compile_policy(&self) -> Result<Option<PolicySet>, InterceptError> {
        let set = match self.policy_source()? {
            None => return Ok(None),
            Some(PolicySource::Inline(text)) => PolicySet::from_text(&text),
            Some(PolicySource::File(path)) => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| InterceptError::PolicyFile { path, source })?;
                PolicySet::from_text(&text)
            }
        };
        Ok(Some(set.with_mode(self.evaluation_mode())))
    }
}
