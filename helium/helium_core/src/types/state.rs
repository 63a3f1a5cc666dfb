//! Application lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a loaded application instance.
///
/// ```text
/// CREATED --run()--> RUNNING --returns--> CREATED
/// any state --unload()--> UNLOADED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationState {
    /// Loaded and idle.
    Created,

    /// Inside a `run` call.
    Running,

    /// Torn down. Terminal.
    Unloaded,
}

impl ApplicationState {
    /// Check if the instance may still be run.
    pub fn allows_run(&self) -> bool {
        !matches!(self, Self::Unloaded)
    }

    /// Check if the state machine allows moving from this state to `next`.
    pub fn can_transition_to(&self, next: ApplicationState) -> bool {
        matches!(
            (*self, next),
            (Self::Created, Self::Running)
                | (Self::Running, Self::Created)
                | (Self::Created, Self::Unloaded)
                | (Self::Running, Self::Unloaded)
        )
    }

    /// Encode as a byte for atomic storage.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Running => 1,
            Self::Unloaded => 2,
        }
    }

    /// Decode from [`as_u8`](Self::as_u8). Unknown values read as `Unloaded`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            _ => Self::Unloaded,
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Unloaded => write!(f, "UNLOADED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        use ApplicationState::*;

        assert!(Created.can_transition_to(Running));
        assert!(Running.can_transition_to(Created));
        assert!(Running.can_transition_to(Unloaded));
        assert!(!Unloaded.can_transition_to(Created));
        assert!(!Unloaded.can_transition_to(Running));
        assert!(!Created.can_transition_to(Created));
        assert!(!Unloaded.allows_run());
    }

    #[test]
    fn test_state_byte_encoding() {
        for state in [
            ApplicationState::Created,
            ApplicationState::Running,
            ApplicationState::Unloaded,
        ] {
            assert_eq!(ApplicationState::from_u8(state.as_u8()), state);
        }
        assert_eq!(ApplicationState::from_u8(42), ApplicationState::Unloaded);
    }
}
