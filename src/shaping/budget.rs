//! Size-budget truncation of collection results.

use std::sync::Arc;

use serde_json::Value;

use crate::config::settings::ShapingConfig;
use crate::shaping::{to_pretty_json, ShapingResult};
use crate::utils::constants::{DEFAULT_CHARS_PER_TOKEN, DEFAULT_MAX_TOKENS};

/// Estimates the token cost of a rendered payload.
pub trait SizeEstimator: Send + Sync {
    fn estimate(&self, rendered: &str) -> usize;
}

/// Rough estimate from byte length, rounded up.
#[derive(Debug, Clone, Copy)]
pub struct CharsPerToken(pub usize);

impl Default for CharsPerToken {
    fn default() -> Self {
        CharsPerToken(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl SizeEstimator for CharsPerToken {
    fn estimate(&self, rendered: &str) -> usize {
        rendered.len().div_ceil(self.0.max(1))
    }
}

#[derive(Clone)]
pub struct SizeBudget {
    limit: usize,
    estimator: Arc<dyn SizeEstimator>,
}

impl Default for SizeBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS, Arc::new(CharsPerToken::default()))
    }
}

impl std::fmt::Debug for SizeBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeBudget").field("limit", &self.limit).finish()
    }
}

impl SizeBudget {
    pub fn new(limit: usize, estimator: Arc<dyn SizeEstimator>) -> Self {
        Self { limit, estimator }
    }

    pub fn from_config(cfg: &ShapingConfig) -> Self {
        Self::new(cfg.max_tokens, Arc::new(CharsPerToken(cfg.chars_per_token)))
    }

    pub fn measure(&self, records: &[Value]) -> usize {
        self.estimator.estimate(&to_pretty_json(records))
    }

    fn fits(&self, records: &[Value]) -> bool {
        self.measure(records) <= self.limit
    }
}

/// Longest prefix of `records` whose rendered estimate fits the budget.
///
/// Estimates grow with the prefix length, so the cut point is found by
/// binary search instead of re-rendering the collection once per record.
pub fn truncate_to_budget(mut records: Vec<Value>, budget: &SizeBudget) -> ShapingResult {
    let original_count = records.len();
    if original_count == 0 || budget.fits(&records) {
        return ShapingResult::complete(records);
    }

    // invariant: records[..lo] fits, records[..hi] does not
    let (mut lo, mut hi) = (0, original_count);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if budget.fits(&records[..mid]) {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    records.truncate(lo);
    ShapingResult::truncated(records, original_count)
}
