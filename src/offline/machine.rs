use thiserror::Error;

/// Lifecycle of the offline cache controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Uninstalled,
    Installing,
    Active,
    Updating,
}

impl ControllerState {
    /// Whether requests are intercepted and answered cache-first.
    pub const fn is_controlling(self) -> bool {
        matches!(self, Self::Active | Self::Updating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    BeginInstall,
    BeginUpdate,
    InstallFailed,
    Activate,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ControllerState,
    pub event: ControllerEvent,
    pub to: ControllerState,
}

impl StateTransition {
    pub const fn new(from: ControllerState, event: ControllerEvent, to: ControllerState) -> Self {
        Self { from, event, to }
    }
}

pub type ControllerStateResult<T> = std::result::Result<T, ControllerStateError>;

#[derive(Debug, Error)]
pub enum ControllerStateError {
    #[error("invalid controller transition: from {from:?} using event {event:?}")]
    InvalidTransition {
        from: ControllerState,
        event: ControllerEvent,
    },
}

#[derive(Debug, Default)]
pub struct ControllerMachine {
    state: ControllerState,
    transition_history: Vec<StateTransition>,
}

impl ControllerMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn can_transition(&self, event: ControllerEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: ControllerEvent) -> Option<ControllerState> {
        use ControllerEvent::*;
        match (self.state, event) {
            (ControllerState::Uninstalled, BeginInstall) => Some(ControllerState::Installing),
            (ControllerState::Uninstalled, Resume) => Some(ControllerState::Active),
            (ControllerState::Installing, Activate) => Some(ControllerState::Active),
            (ControllerState::Installing, InstallFailed) => Some(ControllerState::Uninstalled),
            (ControllerState::Active, BeginUpdate) => Some(ControllerState::Updating),
            (ControllerState::Updating, Activate) => Some(ControllerState::Active),
            (ControllerState::Updating, InstallFailed) => Some(ControllerState::Active),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: ControllerEvent) -> ControllerStateResult<ControllerState> {
        tracing::debug!(from = ?self.state, event = ?event, "request controller transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid controller transition requested");
            ControllerStateError::InvalidTransition { from, event }
        })?;

        let record = StateTransition::new(self.state, event, next);
        self.state = next;
        self.transition_history.push(record);

        Ok(self.state)
    }
}

impl std::fmt::Display for ControllerMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ControllerState::{:?}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_transition_tracks_valid_and_invalid_events() {
        let mut machine = ControllerMachine::new();
        assert!(machine.can_transition(ControllerEvent::BeginInstall));
        assert!(machine.can_transition(ControllerEvent::Resume));
        assert!(!machine.can_transition(ControllerEvent::Activate));

        let _ = machine
            .transition(ControllerEvent::BeginInstall)
            .expect("uninstalled -> installing should transition");

        assert!(machine.can_transition(ControllerEvent::Activate));
        assert!(machine.can_transition(ControllerEvent::InstallFailed));
        assert!(!machine.can_transition(ControllerEvent::BeginUpdate));
    }

    #[test]
    fn install_activate_update_cycle_records_history() {
        let mut machine = ControllerMachine::new();
        for event in [
            ControllerEvent::BeginInstall,
            ControllerEvent::Activate,
            ControllerEvent::BeginUpdate,
            ControllerEvent::Activate,
        ] {
            machine.transition(event).expect("lifecycle event should apply");
        }

        assert_eq!(machine.state(), ControllerState::Active);
        assert_eq!(
            machine.history(),
            &[
                StateTransition::new(
                    ControllerState::Uninstalled,
                    ControllerEvent::BeginInstall,
                    ControllerState::Installing
                ),
                StateTransition::new(
                    ControllerState::Installing,
                    ControllerEvent::Activate,
                    ControllerState::Active
                ),
                StateTransition::new(
                    ControllerState::Active,
                    ControllerEvent::BeginUpdate,
                    ControllerState::Updating
                ),
                StateTransition::new(
                    ControllerState::Updating,
                    ControllerEvent::Activate,
                    ControllerState::Active
                ),
            ]
        );
    }

    #[test]
    fn failed_update_keeps_previous_generation_active() {
        let mut machine = ControllerMachine::new();
        machine.transition(ControllerEvent::Resume).unwrap();
        machine.transition(ControllerEvent::BeginUpdate).unwrap();
        let state = machine.transition(ControllerEvent::InstallFailed).unwrap();
        assert_eq!(state, ControllerState::Active);
        assert!(state.is_controlling());
    }

    #[test]
    fn invalid_transition_returns_error_without_mutating_history() {
        let mut machine = ControllerMachine::new();

        let err = machine
            .transition(ControllerEvent::BeginUpdate)
            .expect_err("uninstalled -> update should fail");
        assert!(matches!(
            err,
            ControllerStateError::InvalidTransition {
                from: ControllerState::Uninstalled,
                event: ControllerEvent::BeginUpdate
            }
        ));
        assert_eq!(machine.state(), ControllerState::Uninstalled);
        assert!(machine.history().is_empty());
    }
}
