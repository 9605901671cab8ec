//! Per-request pipeline state machine.
//!
//! `Idle -> HistoryFetched -> UserPersisted -> Retrieved -> ContextBuilt ->
//! Generating -> AssistantPersisted`, with any non-terminal state able to
//! move to `Failed`. There is no retry edge.

use std::fmt;

use lorekeeper_types::error::PipelineStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    HistoryFetched,
    UserPersisted,
    Retrieved,
    ContextBuilt,
    Generating,
    AssistantPersisted,
    Failed { stage: PipelineStage },
}

/// A transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid pipeline transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::AssistantPersisted | PipelineState::Failed { .. }
        )
    }

    /// The only forward successor of this state.
    pub fn successor(&self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            Idle => Some(HistoryFetched),
            HistoryFetched => Some(UserPersisted),
            UserPersisted => Some(Retrieved),
            Retrieved => Some(ContextBuilt),
            ContextBuilt => Some(Generating),
            Generating => Some(AssistantPersisted),
            AssistantPersisted | Failed { .. } => None,
        }
    }

    /// Stage that runs while leaving this state.
    pub fn pending_stage(&self) -> Option<PipelineStage> {
        use PipelineState::*;
        match self {
            Idle => Some(PipelineStage::HistoryFetch),
            HistoryFetched => Some(PipelineStage::PersistUser),
            UserPersisted => Some(PipelineStage::Retrieve),
            Retrieved => Some(PipelineStage::BuildContext),
            ContextBuilt => Some(PipelineStage::Generate),
            Generating => Some(PipelineStage::PersistAssistant),
            AssistantPersisted | Failed { .. } => None,
        }
    }

    /// Move to `to` if it is the successor or a failure from a live state.
    pub fn advance(&mut self, to: PipelineState) -> Result<(), InvalidTransition> {
        let allowed = match to {
            PipelineState::Failed { .. } => !self.is_terminal(),
            _ => self.successor() == Some(to),
        };
        if !allowed {
            return Err(InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::HistoryFetched => write!(f, "history_fetched"),
            PipelineState::UserPersisted => write!(f, "user_persisted"),
            PipelineState::Retrieved => write!(f, "retrieved"),
            PipelineState::ContextBuilt => write!(f, "context_built"),
            PipelineState::Generating => write!(f, "generating"),
            PipelineState::AssistantPersisted => write!(f, "assistant_persisted"),
            PipelineState::Failed { stage } => write!(f, "failed({stage})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_walk() {
        let mut state = PipelineState::Idle;
        let mut visited = vec![state];
        while let Some(next) = state.successor() {
            state.advance(next).unwrap();
            visited.push(state);
        }
        assert_eq!(visited.len(), 7);
        assert_eq!(state, PipelineState::AssistantPersisted);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_skipping_a_step_is_rejected() {
        let mut state = PipelineState::HistoryFetched;
        let err = state.advance(PipelineState::Retrieved).unwrap_err();
        assert_eq!(err.from, PipelineState::HistoryFetched);
        assert_eq!(state, PipelineState::HistoryFetched);
    }

    #[test]
    fn test_failure_from_any_live_state() {
        let mut state = PipelineState::Generating;
        let failed = PipelineState::Failed {
            stage: PipelineStage::Generate,
        };
        state.advance(failed).unwrap();
        assert!(state.is_terminal());
        assert_eq!(state.to_string(), "failed(generate)");
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut done = PipelineState::AssistantPersisted;
        assert!(
            done.advance(PipelineState::Failed {
                stage: PipelineStage::Generate
            })
            .is_err()
        );

        let mut failed = PipelineState::Failed {
            stage: PipelineStage::Retrieve,
        };
        assert!(failed.advance(PipelineState::Retrieved).is_err());
    }

    #[test]
    fn test_pending_stage_matches_successor() {
        assert_eq!(
            PipelineState::UserPersisted.pending_stage(),
            Some(PipelineStage::Retrieve)
        );
        assert_eq!(PipelineState::AssistantPersisted.pending_stage(), None);
    }
}
