//! Tool surface exposed to agents: names, input schemas and dispatch.

pub mod args;
pub mod catalogue;
pub mod handlers;
