use crate::SumiError;
use std::fmt;

/// Lifecycle of a crawl run
///
/// A crawler moves `Idle → Running → Finished` exactly once; a finished crawler
/// cannot be run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// Configured, nothing fetched yet
    #[default]
    Idle,

    /// The control loop is active
    Running,

    /// The frontier drained, a stop condition fired, or the run was cancelled
    Finished,
}

impl RunState {
    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running) | (Self::Running, Self::Finished)
        )
    }

    /// Validates and performs a transition
    pub fn transition(self, next: RunState) -> Result<RunState, SumiError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SumiError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let state = RunState::default();
        assert_eq!(state, RunState::Idle);

        let state = state.transition(RunState::Running).unwrap();
        let state = state.transition(RunState::Finished).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(RunState::Idle.transition(RunState::Finished).is_err());
        assert!(RunState::Finished.transition(RunState::Running).is_err());
        assert!(RunState::Running.transition(RunState::Running).is_err());
        assert!(matches!(
            RunState::Finished.transition(RunState::Idle),
            Err(SumiError::InvalidTransition {
                from: RunState::Finished,
                to: RunState::Idle
            })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunState::Running.to_string(), "running");
    }
}
