// interceptor.rs — Interceptor lifecycle: install, uninstall, stats.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::adapters;
use crate::config::InterceptorConfig;
use crate::enforcement::EnforcementMode;
use crate::error::InterceptError;
use crate::global;
use crate::guard::{Guard, Slot};
use crate::transport::Intercepted;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Snapshot of an interceptor's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterceptorStats {
    pub installed: bool,
    pub enforcement: EnforcementMode,
    pub policy_loaded: bool,
    pub rule_count: usize,
    pub log_file: Option<PathBuf>,
    pub events_logged: u64,
    pub requests_intercepted: u64,
    pub requests_bypassed: u64,
    pub violations: u64,
    pub blocked: u64,
}

/// Policy enforcement for outbound HTTP calls.
///
/// Construction does nothing observable; call [`install`](Self::install) to
/// compile the policy, open the log and start enforcing on every sender
/// returned by [`wrap`](Self::wrap). Dropping an installed interceptor
/// uninstalls it.
#[derive(Debug)]
pub struct Interceptor {
    id: u64,
    config: InterceptorConfig,
    slot: Slot,
}

impl Interceptor {
    pub fn new(config: InterceptorConfig) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            config,
            slot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// Start enforcing. Idempotent for this instance.
    ///
    /// Fails if another interceptor is installed or the configured policy
    /// file cannot be read.
    pub fn install(&self) -> Result<(), InterceptError> {
        let newly = global::claim(self.id, &self.slot, || Guard::from_config(&self.config))?;
        if !newly {
            tracing::debug!("interceptor already installed; install is a no-op");
            return Ok(());
        }

        tracing::info!(
            enforcement = %self.config.enforcement,
            rules = self.rule_count(),
            log_file = ?self.config.log_file,
            adapters = ?adapters::available(),
            "outbound interceptor installed"
        );
        Ok(())
    }

    /// Install for the lifetime of the returned guard.
    pub fn install_scoped(&self) -> Result<InstallGuard<'_>, InterceptError> {
        self.install()?;
        Ok(InstallGuard { interceptor: self })
    }

    /// Stop enforcing and close the log. No-op if not installed.
    pub fn uninstall(&self) {
        if let Some(guard) = global::release(self.id) {
            tracing::info!(
                events_logged = guard.events_logged(),
                violations = guard.violations(),
                "outbound interceptor uninstalled"
            );
        }
    }

    pub fn is_installed(&self) -> bool {
        self.current().is_some()
    }

    /// Number of rules in the installed policy. Zero when not installed.
    pub fn rule_count(&self) -> usize {
        self.current().map_or(0, |g| g.rule_count())
    }

    pub fn stats(&self) -> InterceptorStats {
        let guard = self.current();
        let g = guard.as_deref();
        InterceptorStats {
            installed: g.is_some(),
            enforcement: self.config.enforcement,
            policy_loaded: g.is_some_and(|g| g.policy().is_some()),
            rule_count: g.map_or(0, |g| g.rule_count()),
            log_file: g.and_then(|g| g.log_path()).map(|p| p.to_path_buf()),
            events_logged: g.map_or(0, |g| g.events_logged()),
            requests_intercepted: g.map_or(0, |g| g.requests_intercepted()),
            requests_bypassed: g.map_or(0, |g| g.requests_bypassed()),
            violations: g.map_or(0, |g| g.violations()),
            blocked: g.map_or(0, |g| g.blocked()),
        }
    }

    /// Bind a transport to this interceptor. Requests through it are
    /// enforced while this interceptor is installed and pass through otherwise.
    pub fn wrap<T>(&self, transport: T) -> Intercepted<T> {
        Intercepted::bound(transport, Arc::clone(&self.slot))
    }

    fn current(&self) -> Option<Arc<Guard>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Uninstalls its interceptor when dropped.
#[derive(Debug)]
#[must_use = "the interceptor is uninstalled as soon as the guard is dropped"]
pub struct InstallGuard<'a> {
    interceptor: &'a Interceptor,
}

impl InstallGuard<'_> {
    pub fn interceptor(&self) -> &Interceptor {
        self.interceptor
    }
}

impl Drop for InstallGuard<'_> {
    fn drop(&mut self) {
        self.interceptor.uninstall();
    }
}
