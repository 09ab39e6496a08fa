//! Scheduler state machine types

/// Phases of the scheduler loop.
///
/// `Idle → Discovering → Reporting → Sleeping → Idle`, with `ShuttingDown`
/// reachable from every other state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    #[default]
    Idle,
    Discovering,
    Reporting,
    Sleeping,
    ShuttingDown,
}

impl SchedulerState {
    /// Check if transition to target state is valid
    #[must_use]
    pub fn can_transition_to(self, target: SchedulerState) -> bool {
        use SchedulerState::{Discovering, Idle, Reporting, ShuttingDown, Sleeping};

        matches!(
            (self, target),
            (Idle, Discovering) | (Discovering, Reporting) | (Reporting, Sleeping) | (Sleeping, Idle)
        ) || (target == ShuttingDown && self != ShuttingDown)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == SchedulerState::ShuttingDown
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Discovering => write!(f, "discovering"),
            SchedulerState::Reporting => write!(f, "reporting"),
            SchedulerState::Sleeping => write!(f, "sleeping"),
            SchedulerState::ShuttingDown => write!(f, "shutting_down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SchedulerState::*;

    #[test]
    fn test_cycle_transitions() {
        assert!(Idle.can_transition_to(Discovering));
        assert!(Discovering.can_transition_to(Reporting));
        assert!(Reporting.can_transition_to(Sleeping));
        assert!(Sleeping.can_transition_to(Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Idle.can_transition_to(Reporting));
        assert!(!Discovering.can_transition_to(Sleeping));
        assert!(!Sleeping.can_transition_to(Discovering));
        assert!(!Reporting.can_transition_to(Discovering));
    }

    #[test]
    fn test_shutdown_reachable_from_any_state() {
        for state in [Idle, Discovering, Reporting, Sleeping] {
            assert!(state.can_transition_to(ShuttingDown), "{state}");
        }
        assert!(!ShuttingDown.can_transition_to(ShuttingDown));
        assert!(!ShuttingDown.can_transition_to(Idle));
        assert!(ShuttingDown.is_terminal());
    }
}
