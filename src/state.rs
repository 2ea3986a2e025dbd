// src/state.rs

use std::fmt;
use thiserror::Error;

/// The phases an invocation moves through, in order.
///
/// Every successful step advances exactly one phase. `Failed` can be entered
/// from any non-terminal phase; `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Classified,
    ConfigResolved,
    MemoValidated,
    BackendReady,
    Dispatched,
    Succeeded,
    Failed,
}

impl Phase {
    /// The phase a successful step leads to.
    fn next(self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::Classified),
            Self::Classified => Some(Self::ConfigResolved),
            Self::ConfigResolved => Some(Self::MemoValidated),
            Self::MemoValidated => Some(Self::BackendReady),
            Self::BackendReady => Some(Self::Dispatched),
            Self::Dispatched => Some(Self::Succeeded),
            Self::Succeeded | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invocation of mode '{mode}' cannot move from phase {from} to phase {to}.")]
pub struct TransitionError {
    pub mode: String,
    pub from: Phase,
    pub to: Phase,
}

/// Tracks the phase of one invocation and logs every transition.
#[derive(Debug)]
pub struct PhaseTracker {
    mode: String,
    phase: Phase,
}

impl PhaseTracker {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            phase: Phase::Start,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Moves to `to`, which must be the phase directly after the current one.
    pub fn advance(&mut self, to: Phase) -> Result<(), TransitionError> {
        if self.phase.next() != Some(to) {
            return Err(TransitionError {
                mode: self.mode.clone(),
                from: self.phase,
                to,
            });
        }
        log::debug!("[{}] {} -> {}", self.mode, self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Marks the invocation as failed. Has no effect once a terminal phase is reached.
    pub fn fail(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        log::debug!("[{}] {} -> {}", self.mode, self.phase, Phase::Failed);
        self.phase = Phase::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_walks_every_phase() {
        let mut tracker = PhaseTracker::new("coord");
        for phase in [
            Phase::Classified,
            Phase::ConfigResolved,
            Phase::MemoValidated,
            Phase::BackendReady,
            Phase::Dispatched,
            Phase::Succeeded,
        ] {
            tracker.advance(phase).unwrap();
        }
        assert_eq!(tracker.phase(), Phase::Succeeded);
        assert!(tracker.phase().is_terminal());
    }

    #[test]
    fn test_phases_cannot_be_skipped_or_revisited() {
        let mut tracker = PhaseTracker::new("id");
        let err = tracker.advance(Phase::MemoValidated).unwrap_err();
        assert_eq!(err.from, Phase::Start);

        tracker.advance(Phase::Classified).unwrap();
        assert!(tracker.advance(Phase::Classified).is_err());
        assert!(tracker.advance(Phase::Start).is_err());
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut tracker = PhaseTracker::new("tree");
        tracker.advance(Phase::Classified).unwrap();
        tracker.fail();
        assert_eq!(tracker.phase(), Phase::Failed);
        assert!(tracker.advance(Phase::ConfigResolved).is_err());
        assert!(tracker.advance(Phase::Failed).is_err());
    }

    #[test]
    fn test_success_cannot_turn_into_failure() {
        let mut tracker = PhaseTracker::new("stats");
        tracker.phase = Phase::Succeeded;
        tracker.fail();
        assert_eq!(tracker.phase(), Phase::Succeeded);
    }
}
