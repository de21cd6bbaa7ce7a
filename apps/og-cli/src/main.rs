//! # og-cli
//!
//! Command-line interface for Outbound Guard.
//!
//! - `og check` — evaluate one request against a policy file
//! - `og rules` — list the rules a policy file compiles to
//! - `og log tail/summary` — inspect the intercept event log
//! - `og fetch` — send one real request through an installed interceptor

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use og_intercept::InterceptorConfig;
use tracing_subscriber::EnvFilter;

/// Exit status for a request the policy denies.
const EXIT_DENIED: u8 = 2;

/// Outbound Guard CLI — policy checks and intercept logs for agent HTTP traffic.
#[derive(Parser)]
#[command(name = "og", version, about)]
struct Cli {
    /// Raise og crate logging to debug.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single request against a policy file.
    Check {
        /// Policy file to evaluate against.
        #[arg(long)]
        policy: PathBuf,
        /// HTTP method of the request.
        #[arg(long, default_value = "GET")]
        method: String,
        /// Deny requests no permit rule matches.
        #[arg(long)]
        strict: bool,
        /// Request header as NAME:VALUE (repeatable).
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,
        /// Full request URL.
        url: String,
    },
    /// List the rules parsed from a policy file.
    Rules {
        /// Policy file to parse.
        #[arg(long)]
        policy: PathBuf,
        /// Print rules as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Inspect the intercept event log.
    Log {
        #[command(subcommand)]
        command: commands::log::LogCommands,
    },
    /// Send one request through an installed interceptor.
    Fetch {
        /// Interceptor config (TOML). Defaults apply if the file is missing.
        #[arg(long, default_value = "og.toml")]
        config: PathBuf,
        /// HTTP method of the request.
        #[arg(long, default_value = "GET")]
        method: String,
        /// Full request URL.
        url: String,
    },
}

/// `--debug`, or `debug = true` in the config `og fetch` loads.
///
/// An unreadable config counts as not set; `fetch` reports the load error.
fn debug_requested(cli: &Cli) -> bool {
    if cli.debug {
        return true;
    }
    match &cli.command {
        Commands::Fetch { config, .. } => InterceptorConfig::load_or_default(config)
            .map(|c| c.debug)
            .unwrap_or(false),
        _ => false,
    }
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("og_intercept={}", level).parse()?)
                .add_directive(format!("og_policy={}", level).parse()?)
                .add_directive(format!("og_audit={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}

fn exit_for(allowed: bool) -> ExitCode {
    if allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_DENIED)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(debug_requested(&cli))?;

    match &cli.command {
        Commands::Check {
            policy,
            method,
            strict,
            headers,
            url,
        } => commands::check::execute(policy, method, *strict, headers, url).map(exit_for),
        Commands::Rules { policy, json } => {
            commands::rules::execute(policy, *json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Log { command } => {
            commands::log::execute(command)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fetch {
            config,
            method,
            url,
        } => commands::fetch::execute(config, method, url).map(exit_for),
    }
}
