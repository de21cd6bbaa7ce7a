// error.rs — Error types for the interceptor.
//
// Two very different kinds of failure live here:
//
// - InterceptError: configuration and lifecycle problems, raised from
//   `install()` or config loading. Never raised on the request path.
// - SendError: what an intercepted `send` returns. Either the policy blocked
//   the request (PolicyViolation) or the wrapped transport failed, in which
//   case its original error is passed through untouched.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from configuring or installing an interceptor.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// Another interceptor instance currently owns the process-wide slot.
    #[error("interceptor already installed by another instance")]
    AlreadyInstalled,

    /// An explicitly requested policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    PolicyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The interceptor config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The interceptor config file is not valid TOML for this schema.
    #[error("invalid interceptor config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Unknown enforcement mode string.
    #[error("invalid enforcement mode '{0}': must be one of 'block', 'warn', 'log'")]
    InvalidEnforcement(String),

    /// Both a policy file and inline policy text were configured.
    #[error("both policy_file and policy are set; configure only one policy source")]
    ConflictingPolicySource,
}

/// A request denied by policy while running in block mode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("request blocked by policy [{action}] {target}: {}", .reasons.join("; "))]
pub struct PolicyViolation {
    /// Kind of action that was blocked. Always `"http"` for this crate.
    pub action: String,
    /// `"<METHOD> <url>"`.
    pub target: String,
    /// The evaluator's reasons, in source order.
    pub reasons: Vec<String>,
    /// Raw source of each forbid rule that matched.
    pub matched_rules: Vec<String>,
}

/// Error returned by an [`Intercepted`](crate::Intercepted) sender.
#[derive(Debug, Error)]
pub enum SendError<E> {
    /// The policy denied the request; nothing was sent.
    #[error(transparent)]
    Blocked(#[from] PolicyViolation),

    /// The wrapped transport failed. The original error is kept intact.
    #[error(transparent)]
    Transport(E),
}

impl<E> SendError<E> {
    pub fn is_blocked(&self) -> bool {
        matches!(self, SendError::Blocked(_))
    }

    pub fn violation(&self) -> Option<&PolicyViolation> {
        match self {
            SendError::Blocked(v) => Some(v),
            SendError::Transport(_) => None,
        }
    }

    /// The transport's own error, if that is what failed.
    pub fn into_transport(self) -> Option<E> {
        match self {
            SendError::Transport(e) => Some(e),
            SendError::Blocked(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation() -> PolicyViolation {
        PolicyViolation {
            action: "http".to_string(),
            target: "GET https://blocked.com/".to_string(),
            reasons: vec!["forbid: a".to_string(), "forbid: b".to_string()],
            matched_rules: vec![],
        }
    }

    #[test]
    fn violation_message_embeds_reasons() {
        assert_eq!(
            violation().to_string(),
            "request blocked by policy [http] GET https://blocked.com/: forbid: a; forbid: b"
        );
    }

    #[test]
    fn send_error_distinguishes_policy_from_transport() {
        let blocked: SendError<std::io::Error> = violation().into();
        assert!(blocked.is_blocked());
        assert!(blocked.violation().is_some());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let failed: SendError<std::io::Error> = SendError::Transport(io);
        assert!(!failed.is_blocked());
        assert_eq!(failed.to_string(), "refused");
        assert_eq!(
            failed.into_transport().unwrap().kind(),
            std::io::ErrorKind::ConnectionRefused
        );
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InterceptError>();
        assert_send_sync::<SendError<std::io::Error>>();
    }
}
