//! The interceptor core: bidirectional stdio bridging with governance.
//!
//! Two forwarder tasks run independently so a slow target never delays
//! inbound screening. Each inbound line is screened against the rule set;
//! denials are synthesized locally and injected into the client stream
//! under the shared stdout lock, and a denied request never reaches the
//! target, so its id cannot produce a duplicate response.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, DecisionStatus};
use crate::classifier;
use crate::frame;
use crate::rules::{Permission, RuleSet};
use crate::supervisor::{self, TargetCommand};

/// Outcome of screening one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Screened {
    /// Forward the original line to the target unchanged.
    Forward,
    /// Block the line and send this pre-built denial to the client.
    Deny(String),
}

/// Governance interceptor bridging one client to one target server.
pub struct Interceptor {
    rules: RuleSet,
    audit: AuditSink,
    service_override: Option<String>,
    project: Option<String>,
}

impl Interceptor {
    /// Create an interceptor over a loaded rule set.
    ///
    /// `service_override` replaces tool-name prefix extraction when set:
    /// the outer layer knows the logical service key, which is more
    /// reliable than parsing it out of tool names.
    pub fn new(
        rules: RuleSet,
        audit: AuditSink,
        service_override: Option<String>,
        project: Option<String>,
    ) -> Self {
        Self {
            rules,
            audit,
            service_override,
            project,
        }
    }

    /// Screen one inbound line against the rule set.
    ///
    /// Anything that is not a well-formed `tools/call` forwards unchanged.
    /// Exactly one audit record is emitted per recognized call, and a
    /// denied record is flushed before the denial line is returned, so the
    /// record always precedes the response on the wire.
    pub fn screen(&self, line: &str) -> Screened {
        let Some(call) = frame::parse_tool_call(line) else {
            return Screened::Forward;
        };

        let classified = match classifier::classify(&call.name) {
            Ok(classified) => classified,
            Err(e) => {
                // An MCP-level defect, not a governance decision: let the
                // target produce the protocol error.
                debug!(tool = %call.name, error = %e, "unclassifiable tools/call, forwarding");
                return Screened::Forward;
            }
        };

        let service = self
            .service_override
            .as_deref()
            .unwrap_or(&classified.service);
        let decision = self.rules.decide(service, classified.operation);
        let status = match decision.permission {
            Permission::Allow => DecisionStatus::Allowed,
            Permission::Deny => DecisionStatus::Denied,
        };

        if let Err(e) = self.audit.record_decision(
            &call.name,
            service,
            classified.operation,
            status,
            decision.reason.as_deref(),
            self.project.as_deref(),
        ) {
            warn!(error = %e, "audit write failed");
        }

        match decision.permission {
            Permission::Allow => Screened::Forward,
            Permission::Deny => {
                info!(
                    tool = %call.name,
                    service,
                    operation = %classified.operation,
                    "denied tools/call"
                );
                Screened::Deny(frame::denial_response(
                    call.id.as_ref(),
                    service,
                    classified.operation,
                    decision.reason.as_deref(),
                ))
            }
        }
    }

    /// Run the interceptor: spawn the target, bridge stdio both ways, and
    /// return the exit code derived from the target's status.
    ///
    /// When the client side closes, the target's stdin is dropped and the
    /// target winds down on EOF. When the target exits, remaining buffered
    /// output is drained and further inbound bytes are discarded.
    pub async fn run(self, target: &TargetCommand) -> anyhow::Result<i32> {
        let mut child = target.spawn()?;
        let target_stdin = child.stdin.take().context("target stdin not piped")?;
        let target_stdout = child.stdout.take().context("target stdout not piped")?;

        info!(target = %target.display(), "target spawned");

        let this = Arc::new(self);
        let client_out = Arc::new(Mutex::new(tokio::io::stdout()));

        let inbound = tokio::spawn(pump_inbound(
            Arc::clone(&this),
            BufReader::new(tokio::io::stdin()),
            target_stdin,
            Arc::clone(&client_out),
        ));
        let outbound = tokio::spawn(pump_outbound(
            BufReader::new(target_stdout),
            Arc::clone(&client_out),
        ));

        #[cfg(unix)]
        let relay = match child.id() {
            Some(pid) => Some(supervisor::relay_signals(pid)?),
            None => None,
        };

        let status = child.wait().await.context("failed waiting on target")?;

        // Draining: flush whatever the target left buffered, then stop
        // reading the client; inbound bytes past this point are discarded.
        let _ = outbound.await;
        inbound.abort();
        #[cfg(unix)]
        if let Some(relay) = relay {
            relay.abort();
        }

        let code = supervisor::exit_code(status);
        info!(code, "target exited");
        Ok(code)
    }
}

/// Client → target forwarder: screen each line, forward or deny.
async fn pump_inbound<R, T, O>(
    interceptor: Arc<Interceptor>,
    mut client_in: R,
    mut target_in: T,
    client_out: Arc<Mutex<O>>,
) where
    R: AsyncBufRead + Unpin,
    T: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match client_in.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "client read failed");
                break;
            }
        }
        let content = frame::trim_line_ending(&line);
        match interceptor.screen(content) {
            Screened::Forward => {
                if write_line(&mut target_in, content).await.is_err() {
                    // The target went away; stop reading so the client
                    // sees the shutdown through the drained streams.
                    break;
                }
            }
            Screened::Deny(response) => {
                let mut out = client_out.lock().await;
                if write_line(&mut *out, &response).await.is_err() {
                    break;
                }
            }
        }
    }
    // Dropping target_in closes the pipe; the target sees EOF.
}

/// Target → client forwarder: verbatim line pass-through.
async fn pump_outbound<R, O>(mut target_out: R, client_out: Arc<Mutex<O>>)
where
    R: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match target_out.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "target read failed");
                break;
            }
        }
        let content = frame::trim_line_ending(&line);
        let mut out = client_out.lock().await;
        if write_line(&mut *out, content).await.is_err() {
            break;
        }
    }
}

/// Write one line plus `\n` and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
