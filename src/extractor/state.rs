//! Extraction state tracking.
//!
//! `ExtractionState` carries one run through its phases: the collected
//! components, the output budget, and the counters and error records that
//! end up in the metrics.

use std::fmt;

use tracing::debug;

use crate::metrics::{ErrorKind, RunStats};
use crate::result::ExtractedComponent;

/// Phases of one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LoadingPage,
    PatternDetection,
    SelectorPass,
    RecursivePass,
    Dedup,
    Sort,
    Metrics,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::LoadingPage => "loading-page",
            Self::PatternDetection => "pattern-detection",
            Self::SelectorPass => "selector-pass",
            Self::RecursivePass => "recursive-pass",
            Self::Dedup => "dedup",
            Self::Sort => "sort",
            Self::Metrics => "metrics",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Mutable state of one run.
#[derive(Debug)]
pub struct ExtractionState {
    phase: Phase,
    budget: usize,
    components: Vec<ExtractedComponent>,
    stats: RunStats,
}

impl ExtractionState {
    /// Fresh state with an output budget of `budget` components.
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Self {
            phase: Phase::Idle,
            budget,
            components: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Move to `phase`.
    pub fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, collected = self.components.len(), "phase change");
        self.phase = phase;
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the output budget is used up.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.components.len() >= self.budget
    }

    /// One-based ordinal of the next component.
    #[must_use]
    pub fn next_ordinal(&self) -> usize {
        self.components.len() + 1
    }

    /// Add a component. Ignored once the budget is used up.
    pub fn push(&mut self, component: ExtractedComponent) -> bool {
        if self.is_full() {
            return false;
        }
        self.components.push(component);
        true
    }

    #[must_use]
    pub fn components(&self) -> &[ExtractedComponent] {
        &self.components
    }

    pub fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    /// Count an element entering the per-element pipeline.
    pub fn saw_element(&mut self) {
        self.stats.saw_element();
    }

    /// Record a recoverable failure.
    pub fn record(&mut self, kind: ErrorKind, message: impl Into<String>, selector: Option<&str>) {
        self.stats.record(kind, message, selector);
    }

    /// Take the collected components out, leaving none.
    pub fn take_components(&mut self) -> Vec<ExtractedComponent> {
        std::mem::take(&mut self.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_with_full_budget() {
        let state = ExtractionState::new(3);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(!state.is_full());
        assert_eq!(state.next_ordinal(), 1);
    }

    #[test]
    fn zero_budget_is_full_immediately() {
        assert!(ExtractionState::new(0).is_full());
    }

    #[test]
    fn records_flow_into_stats() {
        let mut state = ExtractionState::new(1);
        state.enter(Phase::SelectorPass);
        state.saw_element();
        state.record(ErrorKind::FixedPosition, "overlay", Some(".modal"));
        assert_eq!(state.phase(), Phase::SelectorPass);
        let stats = std::mem::take(state.stats_mut());
        assert_eq!(stats.total_elements, 1);
        assert_eq!(stats.failed_extractions, 1);
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::PatternDetection.to_string(), "pattern-detection");
        assert_eq!(Phase::Completed.to_string(), "completed");
    }
}
