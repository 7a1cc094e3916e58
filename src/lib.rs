//! Toolgate — governance interception for MCP tool traffic.
//!
//! Toolgate sits between an MCP client and a target MCP server as a
//! transparent stdio mediator. It spawns the target, bridges the
//! newline-delimited JSON-RPC stream in both directions, classifies every
//! `tools/call` into a `(service, operation)` pair, consults a declarative
//! rule set to allow or deny, synthesizes protocol-correct denials without
//! ever invoking the target, and emits one structured audit record per
//! decision on stderr.
//!
//! The rule set is loaded once at startup and immutable for the life of
//! the process; the default when nothing matches is allow, because the
//! system is additive hardening over an ecosystem with no native gating.

pub mod audit;
pub mod classifier;
pub mod frame;
pub mod interceptor;
pub mod logging;
pub mod rules;
pub mod supervisor;
