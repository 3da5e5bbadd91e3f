//! Login form state machine using rust-fsm.
//!
//! ```text
//!   ┌──────┐  Submit   ┌────────────┐  Succeeded  ┌───────────────┐
//!   │ Idle │ ────────► │ Submitting │ ──────────► │ Authenticated │
//!   └──────┘           └─────┬──────┘             └───────┬───────┘
//!      ▲                     │ Rejected                   │ Reset
//!      │   Retry        ┌────▼───┐                        │
//!      └────────────────│ Failed │                        │
//!      ▲                └────────┘                        │
//!      └──────────────────────────────────────────────────┘
//! ```
//!
//! Validation failures never leave `Idle`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub login_machine(Idle)

    Idle => {
        Submit => Submitting
    },
    Submitting => {
        Succeeded => Authenticated,
        Rejected => Failed
    },
    Failed => {
        Retry => Idle
    },
    Authenticated => {
        Reset => Idle
    }
}

pub use login_machine::Input as LoginMachineInput;
pub use login_machine::State as LoginMachineState;
pub use login_machine::StateMachine as LoginMachine;

/// Login form state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    Idle,
    Submitting,
    Authenticated,
    Failed,
}

impl From<&LoginMachineState> for LoginState {
    fn from(state: &LoginMachineState) -> Self {
        match state {
            LoginMachineState::Idle => LoginState::Idle,
            LoginMachineState::Submitting => LoginState::Submitting,
            LoginMachineState::Authenticated => LoginState::Authenticated,
            LoginMachineState::Failed => LoginState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let machine = LoginMachine::new();
        assert_eq!(*machine.state(), LoginMachineState::Idle);
    }

    #[test]
    fn test_successful_submit() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::Submit).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Submitting);

        machine.consume(&LoginMachineInput::Succeeded).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Authenticated);
    }

    #[test]
    fn test_rejected_submit_returns_to_idle() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::Submit).unwrap();
        machine.consume(&LoginMachineInput::Rejected).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Failed);

        machine.consume(&LoginMachineInput::Retry).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Idle);
    }

    #[test]
    fn test_cannot_submit_twice() {
        let mut machine = LoginMachine::new();

        machine.consume(&LoginMachineInput::Submit).unwrap();
        assert!(machine.consume(&LoginMachineInput::Submit).is_err());
        assert_eq!(*machine.state(), LoginMachineState::Submitting);
    }

    #[test]
    fn test_cannot_authenticate_from_idle() {
        let mut machine = LoginMachine::new();
        assert!(machine.consume(&LoginMachineInput::Succeeded).is_err());
    }

    #[test]
    fn test_reset_after_authenticated() {
        let mut machine = LoginMachine::new();
        machine.consume(&LoginMachineInput::Submit).unwrap();
        machine.consume(&LoginMachineInput::Succeeded).unwrap();

        machine.consume(&LoginMachineInput::Reset).unwrap();
        assert_eq!(*machine.state(), LoginMachineState::Idle);
    }

    #[test]
    fn test_state_conversion() {
        assert_eq!(LoginState::from(&LoginMachineState::Failed), LoginState::Failed);
        assert_eq!(
            serde_json::to_string(&LoginState::Authenticated).unwrap(),
            "\"authenticated\""
        );
    }
}
