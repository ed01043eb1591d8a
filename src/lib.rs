//! # TDX Projects Agent Library
//!
//! Exposes TeamDynamix projects and issues as tool calls for LLM agents.
//! Requests are authenticated and retried per environment, and responses
//! are shaped to stay inside an agent's context budget.
//!
//! Modules:
//! - `config`: service configuration and per-environment credentials
//! - `cache`: bearer token cache with single-flight refresh
//! - `sources`: token acquisition from the TDX auth endpoint
//! - `resilience`: retry policy, attempt classification, request executor
//! - `client`: one method per TDX endpoint
//! - `registry`: named environments and default selection
//! - `shaping`: attribute collapse, projection, feed previews, size budget
//! - `tools`: tool catalogue and dispatch
//! - `server`: stdio JSON-RPC loop and the metrics endpoint

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod server;
pub mod shaping;
pub mod sources;
pub mod tools;
pub mod utils;

#[cfg(test)]
pub mod tests;
