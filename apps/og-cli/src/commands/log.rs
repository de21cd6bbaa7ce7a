// log.rs — Event log subcommands: tail, summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use og_audit::{EnforcementAction, EventLog, InterceptEvent, PolicyVerdict};

/// Where `og fetch` and the SDK examples write events by default.
pub const DEFAULT_LOG: &str = ".og/events.jsonl";

#[derive(Subcommand)]
pub enum LogCommands {
    /// Show recent intercept events.
    Tail {
        /// Path to event log (defaults to .og/events.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// Summarize decisions and actions across the whole log.
    Summary {
        /// Path to event log (defaults to .og/events.jsonl).
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

pub fn execute(cmd: &LogCommands) -> anyhow::Result<()> {
    match cmd {
        LogCommands::Tail { log, n } => {
            let path = resolve(log);
            if !path.exists() {
                println!("No event log found at {}", path.display());
                return Ok(());
            }

            let recent = EventLog::tail(&path, *n)?;
            if recent.is_empty() {
                println!("No intercept events.");
                return Ok(());
            }

            println!(
                "{:<20} {:<7} {:<8} {:<6} {:>9} URL",
                "TIMESTAMP", "METHOD", "ACTION", "STATUS", "MS"
            );
            println!("{}", "-".repeat(90));
            for event in &recent {
                println!(
                    "{:<20} {:<7} {:<8} {:<6} {:>9.2} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.method,
                    format!("{:?}", event.enforcement_action),
                    event.status.map_or("-".to_string(), |s| s.to_string()),
                    event.duration_ms,
                    event.url,
                );
                if let Some(error) = &event.error {
                    println!("{:>22}{}", "", error);
                }
            }
        }

        LogCommands::Summary { log } => {
            let path = resolve(log);
            if !path.exists() {
                println!("No event log found at {}", path.display());
                return Ok(());
            }

            let events = EventLog::read_all(&path)?;
            print!("{}", Summary::from_events(&events));
        }
    }

    Ok(())
}

fn resolve(log: &Option<PathBuf>) -> PathBuf {
    log.clone().unwrap_or_else(|| Path::new(DEFAULT_LOG).to_path_buf())
}

/// Aggregate counts over a set of events.
#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub denied: usize,
    pub by_action: BTreeMap<String, usize>,
    /// Hostnames of denied requests, with counts.
    pub denied_hosts: BTreeMap<String, usize>,
}

impl Summary {
    pub fn from_events(events: &[InterceptEvent]) -> Self {
        let mut summary = Self {
            total: events.len(),
            ..Self::default()
        };
        for event in events {
            *summary
                .by_action
                .entry(action_label(event.enforcement_action).to_string())
                .or_default() += 1;
            if event.policy_decision == PolicyVerdict::Deny {
                summary.denied += 1;
                let host = event.hostname.clone().unwrap_or_else(|| "-".to_string());
                *summary.denied_hosts.entry(host).or_default() += 1;
            }
        }
        summary
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Events:  {}", self.total)?;
        writeln!(f, "Denied:  {}", self.denied)?;
        for (action, count) in &self.by_action {
            writeln!(f, "  {:<8} {}", action, count)?;
        }
        if !self.denied_hosts.is_empty() {
            writeln!(f, "Denied hosts:")?;
            for (host, count) in &self.denied_hosts {
                writeln!(f, "  {:<40} {}", host, count)?;
            }
        }
        Ok(())
    }
}

fn action_label(action: EnforcementAction) -> &'static str {
    match action {
        EnforcementAction::Allowed => "allowed",
        EnforcementAction::Warned => "warned",
        EnforcementAction::Blocked => "blocked",
        EnforcementAction::Logged => "logged",
        EnforcementAction::Error => "error",
    }
}
