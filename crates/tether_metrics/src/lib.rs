//! Tether Metrics - call statistics for the script bridge
//!
//! Provides zero-cost abstractions for tracking script calls that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable statistics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tether_metrics::{CallOutcome, CallStats};
//!
//! let mut stats = CallStats::new();
//! stats.record("GameHooks.onTurn", CallOutcome::Succeeded, elapsed);
//! println!("failures: {}", stats.totals().failed);
//! ```
//!
//! In production builds (without `metrics` feature), `CallStats` records
//! nothing and every query returns zeroed statistics.

use std::time::Duration;

#[cfg(feature = "metrics")]
mod call_stats;

#[cfg(feature = "metrics")]
pub use call_stats::CallStats;

/// How a single script call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Succeeded,
    Failed,
    /// Succeeded, but the script side ran its default implementation
    Defaulted,
}

/// Accumulated statistics for one `module.function` target
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TargetStats {
    pub issued: usize,
    pub failed: usize,
    pub defaulted: usize,
    pub elapsed: Duration,
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct CallStats;

#[cfg(not(feature = "metrics"))]
impl CallStats {
    pub fn new() -> Self { Self }
    pub fn record(&mut self, _target: &str, _outcome: CallOutcome, _elapsed: Duration) {}
    pub fn get(&self, _target: &str) -> TargetStats { TargetStats::default() }
    pub fn totals(&self) -> TargetStats { TargetStats::default() }
    pub fn reset_all(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
impl Default for CallStats {
    fn default() -> Self { Self }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_compiles_without_metrics() {
        // Ensure stubs compile when metrics feature is disabled
        let mut stats = super::CallStats::new();
        stats.record("M.f", super::CallOutcome::Failed, std::time::Duration::ZERO);
        let _ = stats.totals();
    }
}
