//! Per-target statistics for script calls

use crate::{CallOutcome, TargetStats};
use std::collections::HashMap;
use std::time::Duration;

/// Counts issued, failed and defaulted calls keyed by `module.function`.
pub struct CallStats {
    targets: HashMap<String, TargetStats>,
}

impl CallStats {
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
        }
    }

    pub fn record(&mut self, target: &str, outcome: CallOutcome, elapsed: Duration) {
        let stats = self.targets.entry(target.to_string()).or_default();
        stats.issued += 1;
        stats.elapsed += elapsed;
        match outcome {
            CallOutcome::Succeeded => {}
            CallOutcome::Failed => stats.failed += 1,
            CallOutcome::Defaulted => stats.defaulted += 1,
        }
    }

    pub fn get(&self, target: &str) -> TargetStats {
        self.targets.get(target).copied().unwrap_or_default()
    }

    /// Sum over every target seen so far.
    pub fn totals(&self) -> TargetStats {
        self.targets
            .values()
            .fold(TargetStats::default(), |mut acc, stats| {
                acc.issued += stats.issued;
                acc.failed += stats.failed;
                acc.defaulted += stats.defaulted;
                acc.elapsed += stats.elapsed;
                acc
            })
    }

    pub fn reset_all(&mut self) {
        self.targets.clear();
    }
}

impl Default for CallStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_outcomes_per_target() {
        let mut stats = CallStats::new();
        stats.record("Hooks.onTurn", CallOutcome::Succeeded, Duration::from_micros(5));
        stats.record("Hooks.onTurn", CallOutcome::Defaulted, Duration::from_micros(5));
        stats.record("Hooks.missing", CallOutcome::Failed, Duration::ZERO);

        let turn = stats.get("Hooks.onTurn");
        assert_eq!(turn.issued, 2);
        assert_eq!(turn.defaulted, 1);
        assert_eq!(turn.failed, 0);
        assert_eq!(turn.elapsed, Duration::from_micros(10));

        let totals = stats.totals();
        assert_eq!(totals.issued, 3);
        assert_eq!(totals.failed, 1);

        stats.reset_all();
        assert_eq!(stats.get("Hooks.onTurn"), TargetStats::default());
    }
}
