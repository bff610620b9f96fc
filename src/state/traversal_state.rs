/// Listing traversal state definitions
///
/// One (title, location) query moves through these states while its search
/// results are harvested.
use std::fmt;

/// Represents the current state of a listing traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalState {
    // ===== Active States =====
    /// Loading the query's search URL
    Navigating,

    /// Waiting for the result container to render
    WaitingForResults,

    /// Reading the currently rendered result cards
    Harvesting,

    /// Clicking the next-page control or scrolling for more results
    ScrollOrPaginate,

    // ===== Terminal State =====
    /// The query is exhausted, over quota, or abandoned
    Done,
}

impl TraversalState {
    /// Returns true if no further work happens for the query
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks if a transition from this state to another is valid
    ///
    /// Any active state may jump straight to `Done` (timeouts and failures are
    /// local to the query).
    pub fn can_transition_to(&self, next: TraversalState) -> bool {
        use TraversalState::*;

        match (self, next) {
            (Navigating, WaitingForResults) => true,
            (WaitingForResults, Harvesting) => true,
            (Harvesting, ScrollOrPaginate) => true,
            (ScrollOrPaginate, Harvesting) => true,
            // Pagination re-waits for the next page's result container
            (ScrollOrPaginate, WaitingForResults) => true,
            (Done, _) => false,
            (_, Done) => true,
            _ => false,
        }
    }

    /// Short lowercase label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Navigating => "navigating",
            Self::WaitingForResults => "waiting_for_results",
            Self::Harvesting => "harvesting",
            Self::ScrollOrPaginate => "scroll_or_paginate",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TraversalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use TraversalState::*;
        assert!(Navigating.can_transition_to(WaitingForResults));
        assert!(WaitingForResults.can_transition_to(Harvesting));
        assert!(Harvesting.can_transition_to(ScrollOrPaginate));
        assert!(ScrollOrPaginate.can_transition_to(Harvesting));
        assert!(ScrollOrPaginate.can_transition_to(WaitingForResults));
    }

    #[test]
    fn test_every_active_state_can_finish() {
        use TraversalState::*;
        for state in [Navigating, WaitingForResults, Harvesting, ScrollOrPaginate] {
            assert!(state.can_transition_to(Done), "{} -> done", state);
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn test_invalid_transitions() {
        use TraversalState::*;
        assert!(!Navigating.can_transition_to(Harvesting));
        assert!(!Harvesting.can_transition_to(Navigating));
        assert!(!Done.can_transition_to(Navigating));
        assert!(!Done.can_transition_to(Done));
    }
}
