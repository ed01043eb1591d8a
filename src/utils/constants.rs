//! Shared constants and invariants

pub const SERVER_NAME: &str = "tdx-projects-agent";
pub const DEFAULT_ENVIRONMENT: &str = "prod";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 20000;

/// Fallback order when the configured default environment is unavailable.
pub const ENVIRONMENT_PREFERENCE: [&str; 4] = ["prod", "test", "canary", "dev"];

// Response size governance
pub const DEFAULT_MAX_TOKENS: usize = 25000;
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;
pub const BODY_PREVIEW_CHARS: usize = 100;

// Search payload limit enforced by the API
pub const MAX_SEARCH_RESULTS: u64 = 1000;
