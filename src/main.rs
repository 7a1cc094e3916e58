//! Toolgate CLI entry point.
//!
//! Spawns the target MCP server and mediates its stdio, gating
//! `tools/call` requests against the rules file and emitting one audit
//! record per decision on stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use toolgate::audit::AuditSink;
use toolgate::interceptor::Interceptor;
use toolgate::logging;
use toolgate::rules::RuleSet;
use toolgate::supervisor::TargetCommand;

/// Toolgate — governance interceptor for MCP tool traffic.
#[derive(Parser)]
#[command(name = "toolgate", version, about)]
struct Cli {
    /// Target MCP server command, split into an argv vector on whitespace.
    #[arg(long)]
    target: String,

    /// Path to the JSON rules file.
    #[arg(long)]
    rules: PathBuf,

    /// Service name override; replaces tool-name prefix extraction.
    #[arg(long)]
    service: Option<String>,

    /// Project identifier stamped into audit records.
    #[arg(long)]
    project: Option<String>,

    /// Directory for daily-rotated JSON log files, in addition to stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version print clean; every real argument error is a
            // startup failure, exit code 1.
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("toolgate: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

/// Load the rules, spawn the target, and bridge until it exits.
async fn run(cli: Cli) -> anyhow::Result<i32> {
    let _logging_guard = match &cli.log_dir {
        Some(dir) => Some(logging::init_with_file(dir)?),
        None => {
            logging::init_stderr();
            None
        }
    };

    let target = TargetCommand::parse(&cli.target)?;
    let rules = RuleSet::load(&cli.rules)
        .with_context(|| format!("failed to load rules from {}", cli.rules.display()))?;

    tracing::info!(
        rules = rules.len(),
        target = %target.display(),
        service_override = cli.service.as_deref().unwrap_or("-"),
        "toolgate starting"
    );

    let interceptor = Interceptor::new(rules, AuditSink::stderr(), cli.service, cli.project);
    interceptor.run(&target).await
}
